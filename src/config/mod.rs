mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub root_dir: Option<PathBuf>,
    pub organized_dir: Option<PathBuf>,
    pub fetcher: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the catalog database and the media cache.
    pub root_dir: PathBuf,
    /// Destination of the browsable artist/album projection.
    pub organized_dir: PathBuf,
    /// External command used to fetch media, if configured.
    pub fetcher: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let root_dir = file
            .root_dir
            .map(PathBuf::from)
            .or_else(|| cli.root_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("root_dir must be specified via --root-dir or in config file")
            })?;

        if root_dir.exists() && !root_dir.is_dir() {
            bail!("root_dir is not a directory: {:?}", root_dir);
        }
        std::fs::create_dir_all(&root_dir)
            .with_context(|| format!("Failed to create root dir {:?}", root_dir))?;

        let organized_dir = file
            .organized_dir
            .map(PathBuf::from)
            .or_else(|| cli.organized_dir.clone())
            .unwrap_or_else(|| root_dir.join("organized"));

        let fetcher = file.fetcher.or_else(|| cli.fetcher.clone());

        Ok(Self {
            root_dir,
            organized_dir,
            fetcher,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.root_dir.join("catalog.db")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root_dir.join("cache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            root_dir: Some(temp_dir.path().to_path_buf()),
            organized_dir: Some(PathBuf::from("/music/organized")),
            fetcher: Some("fetch-media".to_string()),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.root_dir, temp_dir.path());
        assert_eq!(config.organized_dir, PathBuf::from("/music/organized"));
        assert_eq!(config.fetcher, Some("fetch-media".to_string()));
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            root_dir: Some(PathBuf::from("/should/be/overridden")),
            organized_dir: Some(PathBuf::from("/cli/organized")),
            fetcher: None,
        };

        let file_config = FileConfig {
            root_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            organized_dir: None,
            fetcher: Some("toml-fetcher".to_string()),
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.root_dir, temp_dir.path());
        assert_eq!(config.fetcher, Some("toml-fetcher".to_string()));
        // CLI value used when TOML doesn't specify
        assert_eq!(config.organized_dir, PathBuf::from("/cli/organized"));
    }

    #[test]
    fn test_resolve_missing_root_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("root_dir must be specified"));
    }

    #[test]
    fn test_resolve_creates_missing_root_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("library");
        let cli = CliConfig {
            root_dir: Some(root.clone()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(root.is_dir());
        assert_eq!(config.organized_dir, root.join("organized"));
    }

    #[test]
    fn test_resolve_root_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            root_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_path_helpers() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            root_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.catalog_db_path(), temp_dir.path().join("catalog.db"));
        assert_eq!(config.cache_dir(), temp_dir.path().join("cache"));
    }
}

//! Media acquisition pass over the catalog.
//!
//! The actual download/transcode step is an external collaborator behind
//! the [`MediaFetcher`] trait; this module owns the cache directory
//! convention (one subdirectory per album under `cache/albums`, finished
//! files under `cache/songs`), the "already downloaded" check against the
//! content-addressed file name, and the cleanup of stale variants of a song
//! whose artwork or identifier changed.

use crate::catalog::{Album, Song};
use crate::catalog_store::SqliteCatalogStore;
use crate::naming;
use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// External media fetch: produce a file for `video_id` inside `dest_dir`.
/// The produced file name must embed the identifier as ` [{video_id}].m4a`
/// so the cache scan can locate it.
pub trait MediaFetcher {
    fn fetch(&self, video_id: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Fetcher that shells out to an external command, invoked as
/// `{program} {video_id} {dest_dir}`. The command is expected to leave the
/// media file in `dest_dir`.
pub struct CommandFetcher {
    program: String,
}

impl CommandFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        CommandFetcher {
            program: program.into(),
        }
    }
}

impl MediaFetcher for CommandFetcher {
    fn fetch(&self, video_id: &str, dest_dir: &Path) -> Result<PathBuf> {
        let status = Command::new(&self.program)
            .arg(video_id)
            .arg(dest_dir)
            .status()
            .with_context(|| format!("Failed to run fetcher '{}'", self.program))?;
        if !status.success() {
            bail!("fetcher '{}' exited with {}", self.program, status);
        }
        find_fetched_file(dest_dir, video_id)?.with_context(|| {
            format!("fetcher '{}' produced no file for [{video_id}]", self.program)
        })
    }
}

/// Locate a fetched file by its embedded identifier suffix.
pub fn find_fetched_file(dir: &Path, video_id: &str) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let suffix = format!(" [{video_id}]{}", naming::MEDIA_EXT);
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.ends_with(&suffix) {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AcquireSummary {
    pub fetched: usize,
    pub cached: usize,
    pub failed: usize,
}

impl fmt::Display for AcquireSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fetched, {} already cached, {} failed",
            self.fetched, self.cached, self.failed
        )
    }
}

pub struct Acquirer<'a, F: MediaFetcher> {
    store: &'a SqliteCatalogStore,
    fetcher: &'a F,
    cache_root: &'a Path,
}

impl<'a, F: MediaFetcher> Acquirer<'a, F> {
    pub fn new(store: &'a SqliteCatalogStore, fetcher: &'a F, cache_root: &'a Path) -> Self {
        Acquirer {
            store,
            fetcher,
            cache_root,
        }
    }

    /// Acquire every song in the catalog that is not yet cached. Per-song
    /// failures are logged and counted; the pass continues.
    pub fn acquire_all(&self) -> Result<AcquireSummary> {
        let songs_dir = self.cache_root.join("songs");
        std::fs::create_dir_all(&songs_dir)
            .with_context(|| format!("Failed to create cache dir {:?}", songs_dir))?;

        let mut summary = AcquireSummary::default();
        for album in self.store.albums_ordered_by_title()? {
            for song in self.store.songs_for_album(album.id)? {
                match self.acquire_song(&album, &song, &songs_dir) {
                    Ok(true) => summary.fetched += 1,
                    Ok(false) => summary.cached += 1,
                    Err(e) => {
                        warn!(
                            "Failed to acquire '{} - {} - {}': {e:#}",
                            song.title, album.title, song.artist
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("Acquisition finished: {summary}");
        Ok(summary)
    }

    /// Returns true if the song was fetched, false if already cached.
    fn acquire_song(&self, album: &Album, song: &Song, songs_dir: &Path) -> Result<bool> {
        let display_name = naming::song_display_name(&song.title, &album.title, &song.artist);
        let target_name = naming::cached_file_name(
            songs_dir.to_string_lossy().chars().count(),
            &display_name,
            &naming::artwork_hash(album.artwork_url_or_empty()),
            &song.video_id,
        );
        let target = songs_dir.join(&target_name);
        if target.is_file() {
            return Ok(false);
        }

        self.remove_stale_variants(songs_dir, &display_name, &target_name)?;

        let album_dir = self
            .cache_root
            .join("albums")
            .join(naming::escape(&album.title));
        std::fs::create_dir_all(&album_dir)?;

        let fetched = match find_fetched_file(&album_dir, &song.video_id)? {
            Some(path) => {
                info!("[=] already downloaded '{}'", path.display());
                path
            }
            None => {
                info!("[+] fetching '{display_name}'");
                self.fetcher.fetch(&song.video_id, &album_dir)?
            }
        };

        std::fs::copy(&fetched, &target)
            .with_context(|| format!("Failed to place '{}' into cache", target.display()))?;
        info!("[+] cached '{}'", target.display());
        Ok(true)
    }

    /// Delete cached variants of the same logical song left over from an
    /// older identifier or artwork; only the current variant is kept.
    fn remove_stale_variants(
        &self,
        songs_dir: &Path,
        display_name: &str,
        target_name: &str,
    ) -> Result<()> {
        let prefix = format!("{} [", naming::escape(display_name));
        for entry in std::fs::read_dir(songs_dir)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name.starts_with(&prefix)
                && file_name.ends_with(naming::MEDIA_EXT)
                && file_name != target_name
            {
                info!("[-] removing stale cache file '{file_name}'");
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Could not remove '{}': {e}", path.display());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewAlbum, NewSong};
    use std::cell::RefCell;

    /// Fetcher writing a predictable file, or failing for chosen ids.
    struct FakeFetcher {
        fail_ids: Vec<String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            FakeFetcher {
                fail_ids: Vec::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing_on(video_id: &str) -> Self {
            FakeFetcher {
                fail_ids: vec![video_id.to_string()],
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl MediaFetcher for FakeFetcher {
        fn fetch(&self, video_id: &str, dest_dir: &Path) -> Result<PathBuf> {
            self.calls.borrow_mut().push(video_id.to_string());
            if self.fail_ids.iter().any(|id| id == video_id) {
                bail!("download failed for [{video_id}]");
            }
            let path = dest_dir.join(format!("fetched [{video_id}]{}", naming::MEDIA_EXT));
            std::fs::write(&path, format!("media-{video_id}"))?;
            Ok(path)
        }
    }

    struct Fixture {
        store: SqliteCatalogStore,
        _tmp: tempfile::TempDir,
        cache_root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::TempDir::new().unwrap();
            let cache_root = tmp.path().join("cache");
            Fixture {
                store: SqliteCatalogStore::open_in_memory().unwrap(),
                _tmp: tmp,
                cache_root,
            }
        }

        fn add_song(&self, album_title: &str, title: &str, video_id: &str) -> Song {
            let album = match self.store.find_album(album_title).unwrap() {
                Some(album) => album,
                None => self
                    .store
                    .create_album(&NewAlbum {
                        title: album_title.to_string(),
                        track_count: None,
                        artist: "X".to_string(),
                        release_date: String::new(),
                        artwork_url: None,
                    })
                    .unwrap(),
            };
            self.store
                .create_song(&NewSong {
                    title: title.to_string(),
                    artist: "X".to_string(),
                    composer: String::new(),
                    genre: String::new(),
                    disc: None,
                    track: None,
                    video_id: video_id.to_string(),
                    album_id: album.id,
                })
                .unwrap()
        }

        fn cached_path(&self, song: &Song, album_title: &str) -> PathBuf {
            let songs_dir = self.cache_root.join("songs");
            let display = naming::song_display_name(&song.title, album_title, &song.artist);
            songs_dir.join(naming::cached_file_name(
                songs_dir.to_string_lossy().chars().count(),
                &display,
                &naming::artwork_hash(""),
                &song.video_id,
            ))
        }
    }

    #[test]
    fn fetches_missing_and_skips_cached() {
        let fx = Fixture::new();
        let song = fx.add_song("Test", "A", "v1");
        let fetcher = FakeFetcher::new();

        let summary = Acquirer::new(&fx.store, &fetcher, &fx.cache_root)
            .acquire_all()
            .unwrap();
        assert_eq!(summary.fetched, 1);
        assert!(fx.cached_path(&song, "Test").is_file());

        // Second pass finds the cached file and does not call the fetcher
        let summary = Acquirer::new(&fx.store, &fetcher, &fx.cache_root)
            .acquire_all()
            .unwrap();
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.fetched, 0);
        assert_eq!(fetcher.calls.borrow().len(), 1);
    }

    #[test]
    fn failure_is_contained_to_one_song() {
        let fx = Fixture::new();
        fx.add_song("Test", "A", "bad");
        fx.add_song("Test", "B", "good");
        let fetcher = FakeFetcher::failing_on("bad");

        let summary = Acquirer::new(&fx.store, &fetcher, &fx.cache_root)
            .acquire_all()
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fetched, 1);
    }

    #[test]
    fn stale_variant_is_removed_when_identifier_changes() {
        let fx = Fixture::new();
        let mut song = fx.add_song("Test", "A", "v1");
        let fetcher = FakeFetcher::new();
        Acquirer::new(&fx.store, &fetcher, &fx.cache_root)
            .acquire_all()
            .unwrap();
        let old_path = fx.cached_path(&song, "Test");
        assert!(old_path.is_file());

        song.video_id = "v2".to_string();
        fx.store.update_song(&song).unwrap();

        Acquirer::new(&fx.store, &fetcher, &fx.cache_root)
            .acquire_all()
            .unwrap();
        assert!(!old_path.exists(), "stale variant should be deleted");
        assert!(fx.cached_path(&song, "Test").is_file());
    }

    #[test]
    fn reuses_already_downloaded_album_file() {
        let fx = Fixture::new();
        let song = fx.add_song("Test", "A", "v1");
        let album_dir = fx.cache_root.join("albums").join("Test");
        std::fs::create_dir_all(&album_dir).unwrap();
        std::fs::write(
            album_dir.join(format!("predownloaded [v1]{}", naming::MEDIA_EXT)),
            "media-v1",
        )
        .unwrap();

        let fetcher = FakeFetcher::new();
        let summary = Acquirer::new(&fx.store, &fetcher, &fx.cache_root)
            .acquire_all()
            .unwrap();
        assert_eq!(summary.fetched, 1);
        assert!(fetcher.calls.borrow().is_empty());
        assert_eq!(
            std::fs::read_to_string(fx.cached_path(&song, "Test")).unwrap(),
            "media-v1"
        );
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use songshelf::acquire::{Acquirer, CommandFetcher};
use songshelf::catalog_store::SqliteCatalogStore;
use songshelf::config::{AppConfig, CliConfig, FileConfig};
use songshelf::library::{group_by_album, read_export, sort_rows, write_export};
use songshelf::organize::Organizer;
use songshelf::reconcile::Reconciler;
use songshelf::resolver::{CommandResolver, NoResolver};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(about = "Personal media catalog reconciliation and organization")]
struct CliArgs {
    /// Library root directory (catalog database and media cache).
    #[clap(long, value_parser = parse_path)]
    root_dir: Option<PathBuf>,

    /// Destination directory for the organized artist/album tree.
    #[clap(long, value_parser = parse_path)]
    organized_dir: Option<PathBuf>,

    /// External command used to fetch media files.
    #[clap(long)]
    fetcher: Option<String>,

    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile a library export against the catalog and rewrite it sorted.
    Parse {
        /// Path to the CSV library export.
        #[clap(value_parser = parse_path)]
        export: PathBuf,

        /// External command used to resolve missing identifiers.
        #[clap(long)]
        resolver: Option<String>,
    },
    /// Sync the organized artist/album tree with the catalog.
    Organize,
    /// Fetch media for every catalog song missing from the cache.
    Fetch,
    /// Search the catalog.
    Search {
        #[clap(subcommand)]
        what: SearchCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SearchCommand {
    /// Songs whose title contains the query.
    Song { query: String },
    /// Songs whose artist contains the query.
    Artist { query: String },
    /// Albums whose title contains the query.
    Album { query: String },
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(
        &CliConfig {
            root_dir: cli_args.root_dir.clone(),
            organized_dir: cli_args.organized_dir.clone(),
            fetcher: cli_args.fetcher.clone(),
        },
        file_config,
    )?;

    let store = SqliteCatalogStore::open(&config.catalog_db_path())?;

    match cli_args.command {
        Command::Parse { export, resolver } => {
            let mut rows = read_export(&export)?;
            let groups = group_by_album(&rows);
            let summary = match resolver {
                Some(program) => {
                    let resolver = CommandResolver::new(program);
                    Reconciler::new(&store, &resolver).reconcile(&groups, &mut rows)?
                }
                None => Reconciler::new(&store, &NoResolver).reconcile(&groups, &mut rows)?,
            };
            sort_rows(&mut rows);
            write_export(&export, &rows)?;
            info!("Rewrote {:?} with {} rows", export, rows.len());
            println!("{summary}");
        }
        Command::Organize => {
            let cache_dir = config.cache_dir();
            let organizer = Organizer::new(&store, &cache_dir, &config.organized_dir);
            println!("{}", organizer.organize()?);
        }
        Command::Fetch => {
            let program = config
                .fetcher
                .clone()
                .context("No fetcher command configured (--fetcher or config file)")?;
            let fetcher = CommandFetcher::new(program);
            let cache_dir = config.cache_dir();
            let acquirer = Acquirer::new(&store, &fetcher, &cache_dir);
            println!("{}", acquirer.acquire_all()?);
        }
        Command::Search { what } => run_search(&store, what)?,
    }

    Ok(())
}

fn run_search(store: &SqliteCatalogStore, what: SearchCommand) -> Result<()> {
    match what {
        SearchCommand::Song { query } => {
            for song in store.search_songs_by_title(&query)? {
                let album = store.album_title(song.album_id)?;
                println!("{} - {} - {}", song.title, album, song.artist);
            }
        }
        SearchCommand::Artist { query } => {
            for song in store.search_songs_by_artist(&query)? {
                let album = store.album_title(song.album_id)?;
                println!("{} - {} - {}", song.title, album, song.artist);
            }
        }
        SearchCommand::Album { query } => {
            for album in store.search_albums_by_title(&query)? {
                println!("{} - {}", album.title, album.artist);
            }
        }
    }
    Ok(())
}

//! Organized library projection.
//!
//! Walks the catalog and keeps a secondary, human-browsable copy of the
//! cached media (`dest/artist/album/title.m4a`) in sync with catalog state.
//! The `organized` side table remembers which video id each destination
//! file was materialized from; comparing it against the song's current id
//! tells whether a refresh is needed. A full pass over an up-to-date
//! catalog performs zero file operations.

use crate::catalog::{Album, Song};
use crate::catalog_store::SqliteCatalogStore;
use crate::naming;
use anyhow::Result;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
enum OrganizeError {
    #[error("cached file missing: {0}")]
    SourceMissing(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    /// Songs projected for the first time.
    pub copied: usize,
    /// Stale projections replaced after an identifier change.
    pub refreshed: usize,
    /// Songs whose projection was already current.
    pub up_to_date: usize,
    pub failed: usize,
}

impl fmt::Display for OrganizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} refreshed, {} up to date, {} failed",
            self.copied, self.refreshed, self.up_to_date, self.failed
        )
    }
}

pub struct Organizer<'a> {
    store: &'a SqliteCatalogStore,
    cache_root: &'a Path,
    dest_root: &'a Path,
}

impl<'a> Organizer<'a> {
    pub fn new(store: &'a SqliteCatalogStore, cache_root: &'a Path, dest_root: &'a Path) -> Self {
        Organizer {
            store,
            cache_root,
            dest_root,
        }
    }

    /// Run one projection pass over the whole catalog. Per-song failures
    /// are logged and counted; only store enumeration failures abort.
    pub fn organize(&self) -> Result<OrganizeSummary> {
        let mut summary = OrganizeSummary::default();

        for album in self.store.albums_ordered_by_title()? {
            for song in self.store.songs_for_album(album.id)? {
                match self.organize_song(&album, &song, &mut summary) {
                    Ok(()) => {}
                    Err(e) => {
                        warn!(
                            "Failed to organize '{} - {} - {}': {e:#}",
                            song.title, album.title, song.artist
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("Organize finished: {summary}");
        Ok(summary)
    }

    fn organize_song(
        &self,
        album: &Album,
        song: &Song,
        summary: &mut OrganizeSummary,
    ) -> std::result::Result<(), OrganizeError> {
        let entry = self.store.find_organized_entry(song.id)?;
        if let Some(entry) = &entry {
            if entry.org_video_id == song.video_id {
                // Already current; no file operations at all
                summary.up_to_date += 1;
                return Ok(());
            }
        }

        let songs_dir = self.cache_root.join("songs");
        let display_name = naming::song_display_name(&song.title, &album.title, &song.artist);
        let source = songs_dir.join(naming::cached_file_name(
            songs_dir.to_string_lossy().chars().count(),
            &display_name,
            &naming::artwork_hash(album.artwork_url_or_empty()),
            &song.video_id,
        ));
        if !source.is_file() {
            return Err(OrganizeError::SourceMissing(source.display().to_string()));
        }

        let dest_dir = self
            .dest_root
            .join(naming::escape(&song.artist))
            .join(naming::escape(&album.title));
        std::fs::create_dir_all(&dest_dir)?;
        let dest = dest_dir.join(naming::clean_file_name(&song.title));

        match entry {
            None => {
                debug!("Projecting new song '{}'", song.title);
                std::fs::copy(&source, &dest)?;
                self.store.upsert_organized_entry(song.id, &song.video_id)?;
                summary.copied += 1;
                info!("[+] organized '{}'", dest.display());
            }
            Some(entry) => {
                // Identifier changed upstream; replace the stale projection
                match std::fs::remove_file(&dest) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        warn!("Stale file already missing: {}", dest.display());
                    }
                    Err(e) => return Err(e.into()),
                }
                std::fs::copy(&source, &dest)?;
                self.store.upsert_organized_entry(song.id, &song.video_id)?;
                summary.refreshed += 1;
                info!(
                    "[~] refreshed '{}' ({} -> {})",
                    dest.display(),
                    entry.org_video_id,
                    song.video_id
                );
            }
        }
        Ok(())
    }
}

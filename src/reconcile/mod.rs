//! Reconciliation of a library export against the catalog.
//!
//! For every album group the reconciler finds or creates the album, then
//! walks the group's rows: existing songs get two-way drift resolution for
//! the video id (export wins when it carries a value, catalog fills the
//! blanks on write-back), new songs are resolved and persisted, and
//! failures are contained to the row that caused them. The same two-way
//! rule applies independently to the album-level artwork reference.
//!
//! Running the same export twice is a no-op on the second pass.

use crate::catalog::{Album, NewAlbum, NewSong};
use crate::catalog_store::SqliteCatalogStore;
use crate::library::{AlbumGroup, ExportRow, TrackRecord};
use crate::resolver::{ResolveError, Resolver};
use anyhow::Result;
use std::fmt;
use tracing::{info, warn};

/// End-of-run accounting. Skipped rows stay visible, unresolved, in the
/// rewritten export; failed rows are store/write failures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub albums_created: usize,
    pub songs_created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} albums created, {} songs created, {} updated, {} unchanged, {} skipped, {} failed",
            self.albums_created,
            self.songs_created,
            self.updated,
            self.unchanged,
            self.skipped,
            self.failed
        )
    }
}

pub struct Reconciler<'a, R: Resolver> {
    store: &'a SqliteCatalogStore,
    resolver: &'a R,
}

impl<'a, R: Resolver> Reconciler<'a, R> {
    pub fn new(store: &'a SqliteCatalogStore, resolver: &'a R) -> Self {
        Reconciler { store, resolver }
    }

    /// Reconcile normalized album groups against the catalog, writing
    /// resolved values back into `rows` at each record's originating index.
    ///
    /// Only a store that is unreachable outright aborts the pass; every
    /// per-row failure is logged, counted and skipped over.
    pub fn reconcile(
        &self,
        groups: &[AlbumGroup],
        rows: &mut [ExportRow],
    ) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        for group in groups {
            let mut album = match self.find_or_create_album(group, &mut summary) {
                Ok(album) => album,
                Err(e) => {
                    warn!("Skipping album '{}': {e:#}", group.title);
                    summary.failed += group.records.len();
                    continue;
                }
            };

            for record in &group.records {
                match self.reconcile_record(&mut album, record, rows, &mut summary) {
                    Ok(()) => {}
                    Err(e) => {
                        warn!(
                            "Failed row for '{} - {} - {}': {e:#}",
                            record.title, group.title, record.artist
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("Reconciliation finished: {summary}");
        Ok(summary)
    }

    fn find_or_create_album(
        &self,
        group: &AlbumGroup,
        summary: &mut ReconcileSummary,
    ) -> Result<Album> {
        if let Some(album) = self.store.find_album(&group.title)? {
            return Ok(album);
        }
        let album = self.store.create_album(&NewAlbum {
            title: group.title.clone(),
            track_count: group.track_count,
            artist: group.album_artist.clone(),
            release_date: group.release_date.clone(),
            artwork_url: if group.artwork_url.is_empty() {
                None
            } else {
                Some(group.artwork_url.clone())
            },
        })?;
        summary.albums_created += 1;
        info!("[+] album '{}'", album.title);
        Ok(album)
    }

    fn reconcile_record(
        &self,
        album: &mut Album,
        record: &TrackRecord,
        rows: &mut [ExportRow],
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        self.reconcile_artwork(album, record, rows, summary)?;

        let existing = self
            .store
            .find_song(&record.title, &record.artist, album.id)?;

        match existing {
            Some(mut song) => {
                if !record.video_id.is_empty() && record.video_id != song.video_id {
                    // Export carries a new identifier: drift toward the export
                    song.video_id = record.video_id.clone();
                    self.store.update_song(&song)?;
                    summary.updated += 1;
                    info!(
                        "[~] video id [{}] -> '{} - {} - {}'",
                        song.video_id, song.title, album.title, song.artist
                    );
                } else {
                    // A non-empty stored identifier always survives an empty
                    // incoming one; it is written back into the row below
                    if record.video_id.is_empty() {
                        rows[record.row_index].video_id = song.video_id.clone();
                    }
                    summary.unchanged += 1;
                }
            }
            None => {
                let video_id = if record.video_id.is_empty() {
                    match self
                        .resolver
                        .resolve(&record.title, &record.artist, &album.title)
                    {
                        Ok(resolved) => resolved.video_id,
                        Err(ResolveError::NotFound { .. }) => {
                            warn!(
                                "[-] no match for '{} - {} - {}', skipping",
                                record.title, album.title, record.artist
                            );
                            summary.skipped += 1;
                            return Ok(());
                        }
                        Err(ResolveError::Other(e)) => return Err(e),
                    }
                } else {
                    record.video_id.clone()
                };

                let song = self.store.create_song(&NewSong {
                    title: record.title.clone(),
                    artist: record.artist.clone(),
                    composer: record.composer.clone(),
                    genre: record.genre.clone(),
                    disc: record.disc,
                    track: record.track,
                    video_id,
                    album_id: album.id,
                })?;
                rows[record.row_index].video_id = song.video_id.clone();
                summary.songs_created += 1;
                info!(
                    "[+] video id [{}] -> '{} - {} - {}'",
                    song.video_id, song.title, album.title, song.artist
                );
            }
        }
        Ok(())
    }

    /// Album-level artwork drift: an incoming non-empty value that differs
    /// overwrites the stored one; an incoming empty value is back-filled
    /// from the store into the export row, never the reverse.
    fn reconcile_artwork(
        &self,
        album: &mut Album,
        record: &TrackRecord,
        rows: &mut [ExportRow],
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        if record.artwork_url.is_empty() {
            if let Some(stored) = &album.artwork_url {
                rows[record.row_index].artwork_url = stored.clone();
            }
        } else if album.artwork_url.as_deref() != Some(record.artwork_url.as_str()) {
            album.artwork_url = Some(record.artwork_url.clone());
            self.store.update_album(album)?;
            summary.updated += 1;
            info!("[~] artwork -> '{}'", album.title);
        }
        Ok(())
    }
}

//! Normalization of raw export rows into canonical track records grouped by
//! album.
//!
//! Groups preserve the original row index of every record so resolved
//! values can be written back to the exact originating row. Album-level
//! fields are seeded from the first row encountered for each album.

use super::ExportRow;
use std::collections::HashMap;

/// Canonical per-track record, numeric fields coerced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackRecord {
    /// Index of the originating row in the export.
    pub row_index: usize,
    pub title: String,
    pub artist: String,
    pub composer: String,
    pub genre: String,
    pub disc: Option<u32>,
    pub track: Option<u32>,
    pub video_id: String,
    pub artwork_url: String,
}

/// All rows sharing one album title, with album-level fields seeded from
/// the first row. An empty album title forms its own (literal) group.
#[derive(Clone, Debug)]
pub struct AlbumGroup {
    pub title: String,
    pub track_count: Option<u32>,
    pub album_artist: String,
    pub release_date: String,
    pub artwork_url: String,
    pub records: Vec<TrackRecord>,
}

/// Coerce a numeric export cell. Empty or unparseable cells are unknown,
/// never zero. Tolerates float formatting ("3.0") left over from
/// spreadsheet tooling.
pub fn parse_count(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 => Some(f as u32),
        _ => None,
    }
}

/// Group export rows by album title, preserving first-seen album order and
/// row order within each group.
pub fn group_by_album(rows: &[ExportRow]) -> Vec<AlbumGroup> {
    let mut groups: Vec<AlbumGroup> = Vec::new();
    let mut index_by_title: HashMap<String, usize> = HashMap::new();

    for (row_index, row) in rows.iter().enumerate() {
        let record = TrackRecord {
            row_index,
            title: row.title.clone(),
            artist: row.artist.clone(),
            composer: row.composer.clone(),
            genre: row.genre.clone(),
            disc: parse_count(&row.disc_number),
            track: parse_count(&row.track_number),
            video_id: row.video_id.clone(),
            artwork_url: row.artwork_url.clone(),
        };

        match index_by_title.get(&row.album) {
            Some(&group_index) => groups[group_index].records.push(record),
            None => {
                index_by_title.insert(row.album.clone(), groups.len());
                groups.push(AlbumGroup {
                    title: row.album.clone(),
                    track_count: parse_count(&row.track_count),
                    album_artist: row.album_artist.clone(),
                    release_date: row.release_date.clone(),
                    artwork_url: row.artwork_url.clone(),
                    records: vec![record],
                });
            }
        }
    }

    groups
}

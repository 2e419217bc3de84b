//! Library export reading, sorting and rewriting.
//!
//! The export is a CSV with a fixed column set. A reconciliation pass reads
//! it in full, writes resolved values back into rows, then rewrites the
//! whole file in the canonical sort order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// One row of the library export. Numeric columns stay strings here: the
/// export may carry empty cells or float-formatted numbers, and rewriting
/// must not alter cells it did not touch. Coercion happens in the
/// normalizer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRow {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Album", default)]
    pub album: String,
    #[serde(rename = "Album Artist", default)]
    pub album_artist: String,
    #[serde(rename = "Video ID", default)]
    pub video_id: String,
    #[serde(rename = "Artwork URL", default)]
    pub artwork_url: String,
    #[serde(rename = "Artist", default)]
    pub artist: String,
    #[serde(rename = "Composer", default)]
    pub composer: String,
    #[serde(rename = "Genre", default)]
    pub genre: String,
    #[serde(rename = "Release Date", default)]
    pub release_date: String,
    #[serde(rename = "Disc Number", default)]
    pub disc_number: String,
    #[serde(rename = "Track Count", default)]
    pub track_count: String,
    #[serde(rename = "Track Number", default)]
    pub track_number: String,
    #[serde(rename = "Sort Album", default)]
    pub sort_album: String,
    #[serde(rename = "Sort Album Artist", default)]
    pub sort_album_artist: String,
}

pub fn read_export(path: &Path) -> Result<Vec<ExportRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open library export {:?}", path))?;
    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<ExportRow>().enumerate() {
        let row = record.with_context(|| format!("Malformed export row {}", line + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn write_export(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to write library export {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Fold a sort field: lowercase, diacritics stripped, with numeric-leading
/// strings pushed after every alphabetic one ('~' sorts after ASCII letters).
fn fold_sort_key(value: &str) -> String {
    let folded: String = value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();
    if folded.starts_with(|c: char| c.is_ascii_digit()) {
        format!("~{folded}")
    } else {
        folded
    }
}

fn numeric_or_last(raw: &str) -> u32 {
    super::parse_count(raw).unwrap_or(u32::MAX)
}

/// Canonical export order: (album artist, album title) case- and
/// diacritic-insensitive, then (disc number, track number) ascending with
/// unknown numbers last. The sort columns take precedence over the display
/// columns when present.
pub fn sort_rows(rows: &mut [ExportRow]) {
    rows.sort_by_cached_key(|row| {
        let album_artist = if row.sort_album_artist.is_empty() {
            &row.album_artist
        } else {
            &row.sort_album_artist
        };
        let album = if row.sort_album.is_empty() {
            &row.album
        } else {
            &row.sort_album
        };
        (
            fold_sort_key(album_artist),
            fold_sort_key(album),
            numeric_or_last(&row.disc_number),
            numeric_or_last(&row.track_number),
        )
    });
}

//! SQLite schema for the catalog database.
//!
//! Three tables: albums (unique by title), songs (unique by the
//! title/artist/album natural key) and organized (one row per song that has
//! been projected into the organized library).

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};

const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("track_count", &SqlType::Integer),
        sqlite_column!("artist", &SqlType::Text, non_null = true, default_value = Some("''")),
        sqlite_column!("release_date", &SqlType::Text, non_null = true, default_value = Some("''")),
        sqlite_column!("artwork_url", &SqlType::Text),
    ],
    indices: &[("idx_albums_title", "title")],
    unique_constraints: &[&["title"]],
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "rowid",
};

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("composer", &SqlType::Text, non_null = true, default_value = Some("''")),
        sqlite_column!("genre", &SqlType::Text, non_null = true, default_value = Some("''")),
        sqlite_column!("disc", &SqlType::Integer),
        sqlite_column!("track", &SqlType::Integer),
        sqlite_column!("video_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "album_rowid",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
    ],
    indices: &[("idx_songs_album", "album_rowid")],
    unique_constraints: &[&["title", "artist", "album_rowid"]],
};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "rowid",
};

const ORGANIZED_TABLE: Table = Table {
    name: "organized",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "song_rowid",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("org_video_id", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["song_rowid"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[ALBUMS_TABLE, SONGS_TABLE, ORGANIZED_TABLE],
    migration: None,
}];

//! SQLite-backed catalog store.
//!
//! Holds the persistent Album/Song records plus the `organized` side table
//! used by the filesystem organizer. Every write is a single-row commit:
//! an interrupted run leaves the catalog valid and a re-run converges.

use super::schema::CATALOG_VERSIONED_SCHEMAS;
use crate::catalog::{Album, NewAlbum, NewSong, OrganizedEntry, Song};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

pub struct SqliteCatalogStore {
    conn: Connection,
}

fn migrate_if_needed(conn: &Connection) -> Result<()> {
    let latest = CATALOG_VERSIONED_SCHEMAS
        .last()
        .expect("at least one schema version");

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest.version);
        latest.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let current_version = (db_version as usize).saturating_sub(BASE_DB_VERSION);

    for schema in CATALOG_VERSIONED_SCHEMAS
        .iter()
        .skip(current_version + 1)
        .filter(|s| s.version <= latest.version)
    {
        if let Some(migration_fn) = schema.migration {
            info!("Migrating catalog db to version {}", schema.version);
            migration_fn(conn)?;
            conn.execute(
                &format!("PRAGMA user_version = {}", BASE_DB_VERSION + schema.version),
                [],
            )?;
        }
    }

    latest.validate(conn)
}

/// Escape LIKE wildcards in user input; queries use `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn parse_album_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        track_count: row.get(2)?,
        artist: row.get(3)?,
        release_date: row.get(4)?,
        artwork_url: row.get(5)?,
    })
}

fn parse_song_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        composer: row.get(3)?,
        genre: row.get(4)?,
        disc: row.get(5)?,
        track: row.get(6)?,
        video_id: row.get(7)?,
        album_id: row.get(8)?,
    })
}

const ALBUM_COLUMNS: &str = "rowid, title, track_count, artist, release_date, artwork_url";
const SONG_COLUMNS: &str =
    "rowid, title, artist, composer, genre, disc, track, video_id, album_rowid";

impl SqliteCatalogStore {
    /// Open (creating if absent) the catalog database at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create catalog db directory {:?}", parent)
            })?;
        }

        let conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate_if_needed(&conn)?;

        let store = SqliteCatalogStore { conn };
        info!(
            "Opened catalog: {} albums, {} songs",
            store.album_count()?,
            store.song_count()?
        );
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate_if_needed(&conn)?;
        Ok(SqliteCatalogStore { conn })
    }

    // =========================================================================
    // Albums
    // =========================================================================

    pub fn find_album(&self, title: &str) -> Result<Option<Album>> {
        match self.conn.query_row(
            &format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE title = ?1"),
            params![title],
            parse_album_row,
        ) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_album(&self, album: &NewAlbum) -> Result<Album> {
        self.conn
            .execute(
                "INSERT INTO albums (title, track_count, artist, release_date, artwork_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &album.title,
                    album.track_count,
                    &album.artist,
                    &album.release_date,
                    &album.artwork_url,
                ],
            )
            .with_context(|| format!("Failed to create album '{}'", album.title))?;
        let id = self.conn.last_insert_rowid();
        Ok(Album {
            id,
            title: album.title.clone(),
            track_count: album.track_count,
            artist: album.artist.clone(),
            release_date: album.release_date.clone(),
            artwork_url: album.artwork_url.clone(),
        })
    }

    pub fn update_album(&self, album: &Album) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE albums SET title = ?1, track_count = ?2, artist = ?3,
                 release_date = ?4, artwork_url = ?5 WHERE rowid = ?6",
                params![
                    &album.title,
                    album.track_count,
                    &album.artist,
                    &album.release_date,
                    &album.artwork_url,
                    album.id,
                ],
            )
            .with_context(|| format!("Failed to update album '{}'", album.title))?;
        if changed == 0 {
            anyhow::bail!("Album with id {} not found", album.id);
        }
        Ok(())
    }

    pub fn albums_ordered_by_title(&self) -> Result<Vec<Album>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT {ALBUM_COLUMNS} FROM albums ORDER BY title"
            ))?;
        let albums = stmt
            .query_map([], parse_album_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    pub fn album_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM albums", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    // =========================================================================
    // Songs
    // =========================================================================

    pub fn find_song(&self, title: &str, artist: &str, album_id: i64) -> Result<Option<Song>> {
        match self.conn.query_row(
            &format!(
                "SELECT {SONG_COLUMNS} FROM songs
                 WHERE title = ?1 AND artist = ?2 AND album_rowid = ?3"
            ),
            params![title, artist, album_id],
            parse_song_row,
        ) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_song(&self, song: &NewSong) -> Result<Song> {
        self.conn
            .execute(
                "INSERT INTO songs (title, artist, composer, genre, disc, track, video_id, album_rowid)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &song.title,
                    &song.artist,
                    &song.composer,
                    &song.genre,
                    song.disc,
                    song.track,
                    &song.video_id,
                    song.album_id,
                ],
            )
            .with_context(|| {
                format!("Failed to create song '{}' by '{}'", song.title, song.artist)
            })?;
        let id = self.conn.last_insert_rowid();
        Ok(Song {
            id,
            title: song.title.clone(),
            artist: song.artist.clone(),
            composer: song.composer.clone(),
            genre: song.genre.clone(),
            disc: song.disc,
            track: song.track,
            video_id: song.video_id.clone(),
            album_id: song.album_id,
        })
    }

    pub fn update_song(&self, song: &Song) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE songs SET title = ?1, artist = ?2, composer = ?3, genre = ?4,
                 disc = ?5, track = ?6, video_id = ?7, album_rowid = ?8 WHERE rowid = ?9",
                params![
                    &song.title,
                    &song.artist,
                    &song.composer,
                    &song.genre,
                    song.disc,
                    song.track,
                    &song.video_id,
                    song.album_id,
                    song.id,
                ],
            )
            .with_context(|| format!("Failed to update song '{}'", song.title))?;
        if changed == 0 {
            anyhow::bail!("Song with id {} not found", song.id);
        }
        Ok(())
    }

    /// Songs of one album in (disc, track) order, unknown numbers last.
    pub fn songs_for_album(&self, album_id: i64) -> Result<Vec<Song>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SONG_COLUMNS} FROM songs WHERE album_rowid = ?1
             ORDER BY disc IS NULL, disc, track IS NULL, track, title"
        ))?;
        let songs = stmt
            .query_map(params![album_id], parse_song_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(songs)
    }

    pub fn song_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    // =========================================================================
    // Catalog searches (case-insensitive substring)
    // =========================================================================

    pub fn search_songs_by_title(&self, query: &str) -> Result<Vec<Song>> {
        self.search_songs("title", query)
    }

    pub fn search_songs_by_artist(&self, query: &str) -> Result<Vec<Song>> {
        self.search_songs("artist", query)
    }

    fn search_songs(&self, column: &str, query: &str) -> Result<Vec<Song>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SONG_COLUMNS} FROM songs
             WHERE {column} LIKE '%' || ?1 || '%' ESCAPE '\\' COLLATE NOCASE
             ORDER BY title"
        ))?;
        let songs = stmt
            .query_map(params![escape_like(query)], parse_song_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(songs)
    }

    pub fn search_albums_by_title(&self, query: &str) -> Result<Vec<Album>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums
             WHERE title LIKE '%' || ?1 || '%' ESCAPE '\\' COLLATE NOCASE
             ORDER BY title"
        ))?;
        let albums = stmt
            .query_map(params![escape_like(query)], parse_album_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    /// Title of the album a song belongs to. Used when printing search
    /// results; a song row always has a parent album.
    pub fn album_title(&self, album_id: i64) -> Result<String> {
        let title = self
            .conn
            .query_row(
                "SELECT title FROM albums WHERE rowid = ?1",
                params![album_id],
                |r| r.get(0),
            )
            .with_context(|| format!("Album with id {} not found", album_id))?;
        Ok(title)
    }

    // =========================================================================
    // Organized side table
    // =========================================================================

    pub fn find_organized_entry(&self, song_id: i64) -> Result<Option<OrganizedEntry>> {
        match self.conn.query_row(
            "SELECT song_rowid, org_video_id FROM organized WHERE song_rowid = ?1",
            params![song_id],
            |row| {
                Ok(OrganizedEntry {
                    song_id: row.get(0)?,
                    org_video_id: row.get(1)?,
                })
            },
        ) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn upsert_organized_entry(&self, song_id: i64, video_id: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO organized (song_rowid, org_video_id) VALUES (?1, ?2)
                 ON CONFLICT (song_rowid) DO UPDATE SET org_video_id = excluded.org_video_id",
                params![song_id, video_id],
            )
            .with_context(|| format!("Failed to record organized entry for song {}", song_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_album(title: &str) -> NewAlbum {
        NewAlbum {
            title: title.to_string(),
            track_count: Some(10),
            artist: "Artist".to_string(),
            release_date: "2021-03-12".to_string(),
            artwork_url: None,
        }
    }

    fn new_song(title: &str, artist: &str, video_id: &str, album_id: i64) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            composer: String::new(),
            genre: "Pop".to_string(),
            disc: Some(1),
            track: Some(3),
            video_id: video_id.to_string(),
            album_id,
        }
    }

    #[test]
    fn album_find_or_create_by_natural_key() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        assert!(store.find_album("Blue").unwrap().is_none());

        let created = store.create_album(&new_album("Blue")).unwrap();
        let found = store.find_album("Blue").unwrap().unwrap();
        assert_eq!(created, found);

        // Second create on the same title violates the unique constraint
        assert!(store.create_album(&new_album("Blue")).is_err());
    }

    #[test]
    fn song_natural_key_is_title_artist_album() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        let blue = store.create_album(&new_album("Blue")).unwrap();
        let red = store.create_album(&new_album("Red")).unwrap();

        store
            .create_song(&new_song("River", "Joni", "v1", blue.id))
            .unwrap();

        // Same title+artist on another album is a different song
        store
            .create_song(&new_song("River", "Joni", "v2", red.id))
            .unwrap();

        // Exact duplicate is rejected
        assert!(store
            .create_song(&new_song("River", "Joni", "v3", blue.id))
            .is_err());

        let found = store.find_song("River", "Joni", blue.id).unwrap().unwrap();
        assert_eq!(found.video_id, "v1");
        assert!(store.find_song("River", "Mitchell", blue.id).unwrap().is_none());
    }

    #[test]
    fn update_song_persists_video_id_change() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        let album = store.create_album(&new_album("Blue")).unwrap();
        let mut song = store
            .create_song(&new_song("River", "Joni", "v1", album.id))
            .unwrap();

        song.video_id = "v2".to_string();
        store.update_song(&song).unwrap();

        let found = store.find_song("River", "Joni", album.id).unwrap().unwrap();
        assert_eq!(found.video_id, "v2");
    }

    #[test]
    fn albums_ordered_by_title_sorts() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        store.create_album(&new_album("Zebra")).unwrap();
        store.create_album(&new_album("Aardvark")).unwrap();

        let titles: Vec<String> = store
            .albums_ordered_by_title()
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Aardvark", "Zebra"]);
    }

    #[test]
    fn organized_entry_upsert_overwrites() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        let album = store.create_album(&new_album("Blue")).unwrap();
        let song = store
            .create_song(&new_song("River", "Joni", "v1", album.id))
            .unwrap();

        assert!(store.find_organized_entry(song.id).unwrap().is_none());

        store.upsert_organized_entry(song.id, "v1").unwrap();
        let entry = store.find_organized_entry(song.id).unwrap().unwrap();
        assert_eq!(entry.org_video_id, "v1");

        store.upsert_organized_entry(song.id, "v2").unwrap();
        let entry = store.find_organized_entry(song.id).unwrap().unwrap();
        assert_eq!(entry.org_video_id, "v2");
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        let album = store.create_album(&new_album("Blue")).unwrap();
        store
            .create_song(&new_song("A Case of You", "Joni", "v1", album.id))
            .unwrap();

        assert_eq!(store.search_songs_by_title("case").unwrap().len(), 1);
        assert_eq!(store.search_songs_by_artist("JONI").unwrap().len(), 1);
        assert_eq!(store.search_albums_by_title("lu").unwrap().len(), 1);
        assert!(store.search_songs_by_title("nope").unwrap().is_empty());

        // LIKE wildcards in the query are literals, not patterns
        assert!(store.search_songs_by_title("%").unwrap().is_empty());
    }
}

/// A song as stored in the catalog.
///
/// Identity is the (title, artist, album) natural key. The video id is the
/// external media identifier and is non-empty for every persisted song; a
/// song whose identifier could not be resolved is not persisted at all and
/// is retried on the next reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub composer: String,
    pub genre: String,
    pub disc: Option<u32>,
    pub track: Option<u32>,
    pub video_id: String,
    pub album_id: i64,
}

/// Field set for creating a song. No identity field; the store assigns
/// the rowid.
#[derive(Clone, Debug)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub composer: String,
    pub genre: String,
    pub disc: Option<u32>,
    pub track: Option<u32>,
    pub video_id: String,
    pub album_id: i64,
}

/// Side-table record tracking the organized projection of one song.
///
/// `org_video_id` is the identifier of the file actually present at the
/// destination path, not necessarily the song's current identifier. A
/// mismatch between the two means the projection is stale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganizedEntry {
    pub song_id: i64,
    pub org_video_id: String,
}

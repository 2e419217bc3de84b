/// An album as stored in the catalog.
///
/// Identity is the title: reconciliation never creates two albums with the
/// same title. The artwork URL is the only field expected to drift between
/// library exports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub track_count: Option<u32>,
    pub artist: String,
    pub release_date: String,
    pub artwork_url: Option<String>,
}

/// Field set for creating an album. Carries no identity on purpose: the
/// store assigns the rowid.
#[derive(Clone, Debug, Default)]
pub struct NewAlbum {
    pub title: String,
    pub track_count: Option<u32>,
    pub artist: String,
    pub release_date: String,
    pub artwork_url: Option<String>,
}

impl Album {
    /// Artwork URL with a missing value flattened to an empty string, the
    /// form the export uses.
    pub fn artwork_url_or_empty(&self) -> &str {
        self.artwork_url.as_deref().unwrap_or("")
    }
}

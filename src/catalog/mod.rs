mod album;
mod song;

pub use album::{Album, NewAlbum};
pub use song::{NewSong, OrganizedEntry, Song};

mod export;
mod normalize;

pub use export::{read_export, sort_rows, write_export, ExportRow};
pub use normalize::{group_by_album, parse_count, AlbumGroup, TrackRecord};

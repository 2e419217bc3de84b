//! File name derivation for cached and organized media files.
//!
//! Cached files are content-addressed: the name embeds the artwork hash and
//! the external video id, so a song re-resolved to a different video or a
//! new artwork gets a distinct file. Organized files use a clean name with
//! no addressing suffix since only one file per song ever lives there.
//!
//! All functions are total. Characters that common filesystems forbid are
//! substituted with visually similar Unicode characters rather than dropped,
//! so two distinct inputs never collide solely due to escaping. Truncation
//! against the path-length budget is lossy by design.

use sha2::{Digest, Sha256};

/// Total budget for directory + file name, in characters.
pub const MAX_PATH_CHARS: usize = 256;

/// Budget for a clean (organized) file name alone, in characters.
pub const MAX_CLEAN_CHARS: usize = 128;

pub const MEDIA_EXT: &str = ".m4a";

const ELLIPSIS: char = '…';

/// Substitute filesystem-reserved characters with Unicode look-alikes.
pub fn escape(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' => '＜',
            '>' => '＞',
            ':' => '：',
            '"' => '＂',
            '/' => '∕',
            '\\' => '⧵',
            '|' => '｜',
            '?' => '？',
            '*' => '＊',
            other => other,
        })
        .collect()
}

/// Hex digest of an artwork URL, truncated to 32 characters so the
/// addressing suffix has a fixed width. The empty URL hashes too; it stands
/// for "no custom artwork" and still participates in the name.
pub fn artwork_hash(artwork_url: &str) -> String {
    let digest = Sha256::digest(artwork_url.as_bytes());
    let mut hex = String::with_capacity(32);
    for byte in digest.iter().take(16) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

fn truncate_chars(name: &str, budget: usize) -> String {
    if name.chars().count() <= budget {
        return name.to_string();
    }
    if budget == 0 {
        return String::new();
    }
    let mut truncated: String = name.chars().take(budget - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

/// Content-addressed file name for the media cache:
/// `{name} [{artwork_hash}] [{video_id}].m4a`, truncated so that the full
/// path (`dir_chars` + separator + name) stays within [`MAX_PATH_CHARS`].
pub fn cached_file_name(dir_chars: usize, name: &str, artwork_hash: &str, video_id: &str) -> String {
    let suffix = format!(" [{artwork_hash}] [{video_id}]{MEDIA_EXT}");
    let budget = MAX_PATH_CHARS
        .saturating_sub(dir_chars + 1)
        .saturating_sub(suffix.chars().count());
    let stem = truncate_chars(&escape(name), budget);
    let full = format!("{stem}{suffix}");
    // Degenerate directories leave no room for the suffix itself
    truncate_chars(&full, MAX_PATH_CHARS.saturating_sub(dir_chars + 1))
}

/// Plain file name for the organized projection: `{title}.m4a`, bounded by
/// the simpler [`MAX_CLEAN_CHARS`] budget.
pub fn clean_file_name(title: &str) -> String {
    let budget = MAX_CLEAN_CHARS.saturating_sub(MEDIA_EXT.chars().count());
    format!("{}{MEDIA_EXT}", truncate_chars(&escape(title), budget))
}

/// Display name for a song's cached file, matching the original library
/// convention of `title - album - artist`.
pub fn song_display_name(title: &str, album_title: &str, artist: &str) -> String {
    format!("{title} - {album_title} - {artist}")
}

//! External identifier resolution seam.
//!
//! The reconciler depends on this trait; the real implementation talks to
//! the upstream music search service and lives outside the core. The CLI
//! wires in [`CommandResolver`] when a resolver command is configured and
//! [`NoResolver`] otherwise; tests use an in-memory fake.

use anyhow::Context;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The service found no candidate. Never fatal to a reconciliation run:
    /// the affected row stays unresolved and is retried on the next pass.
    #[error("no match found for '{title}' by '{artist}'")]
    NotFound { title: String, artist: String },

    #[error("resolver error: {0}")]
    Other(#[from] anyhow::Error),
}

/// A successfully resolved candidate. The canonical names returned by the
/// service may differ from the query.
#[derive(Clone, Debug)]
pub struct ResolvedSong {
    pub video_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
}

pub trait Resolver {
    fn resolve(&self, title: &str, artist: &str, album: &str)
        -> Result<ResolvedSong, ResolveError>;
}

/// Resolver that answers every query with `NotFound`. Used when no resolver
/// command is configured: rows already carrying an identifier still
/// reconcile, the rest stay unresolved until a later pass.
pub struct NoResolver;

impl Resolver for NoResolver {
    fn resolve(
        &self,
        title: &str,
        artist: &str,
        _album: &str,
    ) -> Result<ResolvedSong, ResolveError> {
        Err(ResolveError::NotFound {
            title: title.to_string(),
            artist: artist.to_string(),
        })
    }
}

/// Resolver that shells out to an external command, invoked as
/// `{program} {title} {artist} {album}`. The command prints a single
/// tab-separated line `id<TAB>title<TAB>artist<TAB>album` on success and
/// exits non-zero (or prints nothing) when it found no candidate.
pub struct CommandResolver {
    program: String,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>) -> Self {
        CommandResolver {
            program: program.into(),
        }
    }
}

impl Resolver for CommandResolver {
    fn resolve(
        &self,
        title: &str,
        artist: &str,
        album: &str,
    ) -> Result<ResolvedSong, ResolveError> {
        let not_found = || ResolveError::NotFound {
            title: title.to_string(),
            artist: artist.to_string(),
        };

        let output = Command::new(&self.program)
            .arg(title)
            .arg(artist)
            .arg(album)
            .output()
            .with_context(|| format!("Failed to run resolver '{}'", self.program))?;
        if !output.status.success() {
            return Err(not_found());
        }

        let stdout = String::from_utf8(output.stdout)
            .with_context(|| format!("Resolver '{}' produced invalid utf-8", self.program))?;
        let line = stdout.lines().next().unwrap_or("");
        let mut fields = line.split('\t');
        let video_id = fields.next().unwrap_or("").trim();
        if video_id.is_empty() {
            return Err(not_found());
        }

        // Canonical names default to the query when the command omits them
        Ok(ResolvedSong {
            video_id: video_id.to_string(),
            title: fields.next().unwrap_or(title).to_string(),
            artist: fields.next().unwrap_or(artist).to_string(),
            album: fields.next().unwrap_or(album).to_string(),
        })
    }
}

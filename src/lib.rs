//! Songshelf library.
//!
//! Reconciles a CSV library export against a persistent song catalog,
//! fetches missing media into a content-addressed cache and keeps a
//! browsable artist/album projection of that cache in sync.

pub mod acquire;
pub mod catalog;
pub mod catalog_store;
pub mod config;
pub mod library;
pub mod naming;
pub mod organize;
pub mod reconcile;
pub mod resolver;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog::{Album, Song};
pub use catalog_store::SqliteCatalogStore;
pub use reconcile::{ReconcileSummary, Reconciler};
pub use resolver::{ResolveError, ResolvedSong, Resolver};

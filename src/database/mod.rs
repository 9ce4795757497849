/*!
 * Database module for the artifact record store.
 *
 * SQLite holds one record per artifact key (media, season, episode,
 * language, provider). The record is the authoritative state; files under
 * the subtitles root are managed by `crate::artifacts`.
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{ArtifactKey, ArtifactRecord, ArtifactState, StoreStats};
pub use repository::Repository;

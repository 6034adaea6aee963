//! Storage backend abstraction trait
//!
//! The engine funnels every persistence call through this trait so tests
//! can run against an in-memory database and so write failures can be
//! swallowed at one boundary.

use async_trait::async_trait;
use pageforge_core::{Draft, Session, VersionEntry};

use crate::StorageError;

/// Persistent backend for the three engine documents.
///
/// The trait is async to keep the engine's store task non-blocking; the
/// SQLite implementation uses `spawn_blocking` internally.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert or replace a session, pruning to the most-recent bound.
    async fn save_session(&self, session: &Session) -> Result<(), StorageError>;

    /// All retained sessions, most recent first.
    async fn load_sessions(&self) -> Result<Vec<Session>, StorageError>;

    /// Append a version entry, pruning to the most-recent bound.
    async fn append_version_entry(&self, entry: &VersionEntry) -> Result<(), StorageError>;

    /// Version entries for one artifact, oldest first.
    async fn version_entries(&self, artifact_id: &str) -> Result<Vec<VersionEntry>, StorageError>;

    /// Replace the single draft slot.
    async fn save_draft(&self, draft: &Draft) -> Result<(), StorageError>;

    /// The current draft, if any.
    async fn load_draft(&self) -> Result<Option<Draft>, StorageError>;

    /// Clear the draft slot.
    async fn clear_draft(&self) -> Result<(), StorageError>;
}

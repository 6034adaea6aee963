use pageforge_core::ForgeError;
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
    #[error("Blocking task failed: {0}")]
    Join(String),
}

impl From<StorageError> for ForgeError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

use std::io;
use std::result::Result as StdResult;

use thiserror::Error;

/// Errors that can occur in pageforge
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Content validation failed: {reason}")]
    Validation { reason: String, raw: String },

    #[error("Frame message error: {0}")]
    Frame(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = StdResult<T, ForgeError>;

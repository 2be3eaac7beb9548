//! Error types for the session engine.
//!
//! Store errors never reach the shopper: containers log them and keep
//! trusting in-memory state. They exist so store implementations can report
//! what went wrong and so callers awaiting a write (sign-up, flush) can log
//! it with context.

use thiserror::Error;

/// Failure talking to a local or remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document or collection could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local store key cannot be used as a storage name.
    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),

    /// Remote store could not be reached.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

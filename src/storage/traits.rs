//! Storage traits and error types

use crate::pipeline::DocumentChunk;
use thiserror::Error;

/// Errors that can occur while persisting records
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Destination for enriched chunk records
///
/// Each call writes one complete record as a single unit. Implementations must be
/// safe to call from many workers at once.
pub trait ChunkSink: Send + Sync {
    /// Persists a chunk, returning the location it was written to
    fn persist(&self, chunk: &DocumentChunk) -> StorageResult<String>;
}

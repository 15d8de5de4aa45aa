//! Error types for backend operations

use thiserror::Error;
use uuid::Uuid;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur talking to the block backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested block does not exist for this tenant
    #[error("block {block_id} not found for tenant {tenant}")]
    NotFound { tenant: String, block_id: Uuid },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed block metadata
    #[error("invalid block meta: {0}")]
    Meta(#[from] serde_json::Error),
}

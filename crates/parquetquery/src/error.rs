//! Error types for column iteration

use thiserror::Error;

/// Result type for parquetquery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning columns.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading or decoding the Parquet file
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// I/O error from the backing reader
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested column path does not exist in the file schema
    #[error("column not found: {0}")]
    MissingColumn(String),

    /// The caller cancelled the scan
    #[error("iteration cancelled")]
    Cancelled,

    /// Invariant violation inside an iterator
    #[error("{0}")]
    Internal(String),
}

//! Error types surfaced by a block fetch

use thiserror::Error;

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning or executing a fetch.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed condition: wrong arity, mixed operand types, or an
    /// operator/operand combination the planner cannot serve. Raised before
    /// any I/O happens.
    #[error("conditions invalid: {0}")]
    Validation(String),

    /// The block's version string does not match this engine's encoding.
    #[error("unsupported block version: found {found:?}, expected {expected:?}")]
    UnsupportedBlock { found: String, expected: String },

    /// I/O failure reading the file or a column page.
    #[error("storage error: {0}")]
    Storage(String),

    /// The caller cancelled the fetch. Reported by the next `next()` call
    /// and sticky afterwards.
    #[error("fetch cancelled")]
    Cancelled,

    /// Invariant violation inside the iterator tree. Should be impossible;
    /// fails the fetch.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::UnsupportedBlock {
            found: "v2".into(),
            expected: "vParquet".into(),
        };
        assert!(err.to_string().contains("v2"));
        assert!(err.to_string().contains("vParquet"));
    }
}

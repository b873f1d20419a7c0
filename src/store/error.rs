use thiserror::Error;

/// Failures reported by the store for an operate call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Update-only write against a missing record
    #[error("key not found")]
    KeyNotFound,

    /// Create-only write against an existing record
    #[error("key already exists")]
    KeyExists,

    /// The bin holds a value of a different kind than the operation expects
    #[error("bin type error: bin '{bin}' holds a {found}")]
    BinType { bin: String, found: &'static str },

    /// Malformed operation parameters
    #[error("parameter error: {0}")]
    ParameterError(String),

    /// The operation did not complete in time
    #[error("operation timed out")]
    Timeout,

    /// Transport or backend failure
    #[error("store I/O error: {0}")]
    Io(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

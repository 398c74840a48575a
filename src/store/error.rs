//! Error types for store operations

use std::fmt;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur at the store boundary
///
/// `NotFound` is reserved for lookups where the caller asked for a specific
/// row that must exist (e.g. an endpoint by id). Queries where absence is a
/// normal state (e.g. "is there an open incident?") return `Option` instead,
/// so a missing row is never conflated with a genuine store failure.
#[derive(Debug)]
pub enum StoreError {
    /// The requested row does not exist
    NotFound(String),

    /// The store rejected the operation (constraint violation, bad data)
    InvalidData(String),

    /// The store is temporarily unavailable
    Unavailable(String),

    /// A query failed for a backend-specific reason
    QueryFailed(String),
}

impl StoreError {
    /// Whether retrying the operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::QueryFailed(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "not found: {}", what),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::QueryFailed(msg) => write!(f, "store query failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

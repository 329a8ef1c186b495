//! Error types for policy evaluation

use fedblock_storage::StorageError;
use fedblock_types::TypeError;
use thiserror::Error;

/// Errors returned by the blocking decision
///
/// Every variant means the activity must not be delivered.
#[derive(Debug, Error)]
pub enum BlockError {
    /// Policy configuration cannot produce a decision
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Reading policies or writing resolutions failed
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// Caller supplied an unparsable identifier
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The ambient unit of work was cancelled
    #[error("evaluation cancelled")]
    Cancelled,
}

impl BlockError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Fail-safe closed: no error ever lets the activity through
    pub fn rejects_delivery(&self) -> bool {
        true
    }
}

impl From<TypeError> for BlockError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidIri { .. } => Self::MalformedInput(err.to_string()),
            other => Self::Configuration(other.to_string()),
        }
    }
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, BlockError>;

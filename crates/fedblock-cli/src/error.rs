//! Error types for the fedblock binary

use fedblock_policy::BlockError;
use fedblock_storage::StorageError;
use fedblock_types::TypeError;
use thiserror::Error;

/// Binary-level errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line argument
    #[error("Invalid argument: {0}")]
    Argument(#[from] TypeError),

    /// Storage error outside the blocking decision
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Blocking decision failed
    #[error("Blocking decision failed: {0}")]
    Block(#[from] BlockError),

    /// Output encoding error
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

//! Errors raised while parsing or validating core types

use thiserror::Error;

/// Type-level validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Persisted policy kind is not one of the recognised wire strings
    #[error("unrecognised policy kind `{0}`")]
    UnknownPolicyKind(String),

    /// Persisted purpose is not one of the recognised wire strings
    #[error("unrecognised policy purpose `{0}`")]
    UnknownPurpose(String),

    /// Permit string is not `grant`, `deny` or `unknown`
    #[error("unrecognised permit `{0}`")]
    UnknownPermit(String),

    /// A subject-bearing kind was configured without a subject
    #[error("policy kind `{kind}` requires a non-empty subject")]
    MissingSubject { kind: String },

    /// Subject is not a valid host or actor IRI for its kind
    #[error("invalid subject `{value}` for policy kind `{kind}`: {reason}")]
    InvalidSubject {
        kind: String,
        value: String,
        reason: String,
    },

    /// Identifier could not be parsed as an IRI
    #[error("invalid IRI `{value}`: {reason}")]
    InvalidIri { value: String, reason: String },
}

/// Result type for type-level operations
pub type Result<T> = std::result::Result<T, TypeError>;

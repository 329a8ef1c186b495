//! Three-valued permit lattice
//!
//! Permits are totally ordered by decisiveness, `Deny > Grant > Unknown`.
//! Composition picks the more decisive operand, which makes `Unknown` the
//! identity and `Deny` absorbing.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verdict produced by one policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permit {
    /// The policy permits the interaction
    Grant,

    /// The policy blocks the interaction
    Deny,

    /// The policy has no opinion
    #[default]
    Unknown,
}

impl Permit {
    /// All permit values, useful for exhaustive checks
    pub const ALL: [Permit; 3] = [Permit::Grant, Permit::Deny, Permit::Unknown];

    /// Rank of this permit in the decisiveness order
    pub fn decisiveness(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Grant => 1,
            Self::Deny => 2,
        }
    }

    /// Compose two permits, keeping the more decisive one
    pub fn compose(self, other: Permit) -> Permit {
        match (self, other) {
            (Self::Deny, _) | (_, Self::Deny) => Self::Deny,
            (Self::Grant, _) | (_, Self::Grant) => Self::Grant,
            _ => Self::Unknown,
        }
    }

    /// Fold a sequence of permits starting from the identity
    pub fn fold<I>(permits: I) -> Permit
    where
        I: IntoIterator<Item = Permit>,
    {
        permits
            .into_iter()
            .fold(Self::Unknown, |acc, permit| acc.compose(permit))
    }

    /// Whether no further composition can change this value
    pub fn is_absorbing(self) -> bool {
        matches!(self, Self::Deny)
    }

    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Deny => "deny",
            Self::Unknown => "unknown",
        }
    }
}

impl PartialOrd for Permit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.decisiveness().cmp(&other.decisiveness())
    }
}

impl fmt::Display for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permit {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grant" => Ok(Self::Grant),
            "deny" => Ok(Self::Deny),
            "unknown" => Ok(Self::Unknown),
            other => Err(TypeError::UnknownPermit(other.to_string())),
        }
    }
}

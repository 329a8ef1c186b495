//! Federated identifiers
//!
//! Parsing normalises through `url`: hosts are lowercased, default ports
//! dropped and a bare origin gains a trailing `/`. Policy subjects go
//! through the same parser so string comparison stays exact.

use crate::error::{Result, TypeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

fn parse_iri(value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| TypeError::InvalidIri {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// IRI of a federated actor sending an activity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorIri(Url);

impl ActorIri {
    /// Parse an actor IRI
    pub fn parse(value: &str) -> Result<Self> {
        parse_iri(value).map(Self)
    }

    /// Host component, if the IRI has one
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Exact string form
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for ActorIri {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl FromStr for ActorIri {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ActorIri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IRI of an inbound activity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(Url);

impl ActivityId {
    /// Parse an activity id
    pub fn parse(value: &str) -> Result<Self> {
        parse_iri(value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ActivityId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_host_and_string_form() {
        let actor = ActorIri::parse("https://bad.example/users/mallory").unwrap();
        assert_eq!(actor.host(), Some("bad.example"));
        assert_eq!(actor.as_str(), "https://bad.example/users/mallory");
    }

    #[test]
    fn test_invalid_activity_id() {
        let err = ActivityId::parse("not an iri").unwrap_err();
        assert!(matches!(err, TypeError::InvalidIri { .. }));
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = ActivityId::parse("https://remote.example/activities/1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"https://remote.example/activities/1\"");
        let back: ActivityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

//! Interaction policies
//!
//! A [`PolicyRecord`] is what the policy store persists: kind and purpose
//! are raw strings written by an administrative surface. Turning a record
//! into a [`Policy`] is the load-time validation step; afterwards the
//! policy's behaviour is a closed [`PolicyRule`] variant.

use crate::error::{Result, TypeError};
use crate::iri::ActorIri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Host;
use uuid::Uuid;

/// Persisted discriminator for the six policy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    AlwaysGrant,
    AlwaysDeny,
    InstanceGrant,
    InstanceDeny,
    ActorGrant,
    ActorDeny,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 6] = [
        PolicyKind::AlwaysGrant,
        PolicyKind::AlwaysDeny,
        PolicyKind::InstanceGrant,
        PolicyKind::InstanceDeny,
        PolicyKind::ActorGrant,
        PolicyKind::ActorDeny,
    ];

    /// Wire representation (case-sensitive)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlwaysGrant => "always_grant",
            Self::AlwaysDeny => "always_deny",
            Self::InstanceGrant => "instance_grant",
            Self::InstanceDeny => "instance_deny",
            Self::ActorGrant => "actor_grant",
            Self::ActorDeny => "actor_deny",
        }
    }

    /// Whether policies of this kind match against a subject
    pub fn requires_subject(self) -> bool {
        !matches!(self, Self::AlwaysGrant | Self::AlwaysDeny)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypeError::UnknownPolicyKind(s.to_string()))
    }
}

/// Validated policy behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "subject", rename_all = "snake_case")]
pub enum PolicyRule {
    /// Always grants
    AlwaysGrant,

    /// Always denies
    AlwaysDeny,

    /// Grants when a sender lives on the given host
    InstanceGrant(String),

    /// Denies when a sender lives on the given host
    InstanceDeny(String),

    /// Grants when a sender is exactly the given actor IRI
    ActorGrant(String),

    /// Denies when a sender is exactly the given actor IRI
    ActorDeny(String),
}

impl PolicyRule {
    /// Build a rule from its persisted kind and subject
    pub fn new(kind: PolicyKind, subject: &str) -> Result<Self> {
        if kind.requires_subject() && subject.trim().is_empty() {
            return Err(TypeError::MissingSubject {
                kind: kind.to_string(),
            });
        }

        Ok(match kind {
            PolicyKind::AlwaysGrant => Self::AlwaysGrant,
            PolicyKind::AlwaysDeny => Self::AlwaysDeny,
            PolicyKind::InstanceGrant => Self::InstanceGrant(normalise_host(kind, subject)?),
            PolicyKind::InstanceDeny => Self::InstanceDeny(normalise_host(kind, subject)?),
            PolicyKind::ActorGrant => Self::ActorGrant(normalise_actor(kind, subject)?),
            PolicyKind::ActorDeny => Self::ActorDeny(normalise_actor(kind, subject)?),
        })
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::AlwaysGrant => PolicyKind::AlwaysGrant,
            Self::AlwaysDeny => PolicyKind::AlwaysDeny,
            Self::InstanceGrant(_) => PolicyKind::InstanceGrant,
            Self::InstanceDeny(_) => PolicyKind::InstanceDeny,
            Self::ActorGrant(_) => PolicyKind::ActorGrant,
            Self::ActorDeny(_) => PolicyKind::ActorDeny,
        }
    }

    /// Subject string, empty for the unconditional kinds
    pub fn subject(&self) -> &str {
        match self {
            Self::AlwaysGrant | Self::AlwaysDeny => "",
            Self::InstanceGrant(subject)
            | Self::InstanceDeny(subject)
            | Self::ActorGrant(subject)
            | Self::ActorDeny(subject) => subject,
        }
    }
}

/// Host in the form `Url::host_str` yields for a sender on that host
fn normalise_host(kind: PolicyKind, subject: &str) -> Result<String> {
    Host::parse(subject.trim())
        .map(|host| host.to_string())
        .map_err(|e| TypeError::InvalidSubject {
            kind: kind.to_string(),
            value: subject.to_string(),
            reason: e.to_string(),
        })
}

/// Actor IRI in the exact string form of a parsed sender
fn normalise_actor(kind: PolicyKind, subject: &str) -> Result<String> {
    ActorIri::parse(subject.trim())
        .map(|actor| actor.as_str().to_string())
        .map_err(|e| TypeError::InvalidSubject {
            kind: kind.to_string(),
            value: subject.to_string(),
            reason: e.to_string(),
        })
}

/// Whom a policy applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyScope {
    /// Applies to every local actor on the instance
    Instance,

    /// Applies to a single local actor
    Actor { owner_id: String },
}

impl PolicyScope {
    pub fn from_owner(owner_id: Option<String>) -> Self {
        match owner_id {
            Some(owner_id) => Self::Actor { owner_id },
            None => Self::Instance,
        }
    }

    /// Instance-wide policies are public
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Instance)
    }

    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Self::Instance => None,
            Self::Actor { owner_id } => Some(owner_id),
        }
    }

    /// Whether this scope covers the given local actor
    pub fn covers(&self, user_id: &str) -> bool {
        match self {
            Self::Instance => true,
            Self::Actor { owner_id } => owner_id == user_id,
        }
    }
}

/// Decision category a policy set governs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Blocking of inbound federated activities
    FederatedBlock,
}

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FederatedBlock => "federated_block",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "federated_block" => Ok(Self::FederatedBlock),
            other => Err(TypeError::UnknownPurpose(other.to_string())),
        }
    }
}

/// Persisted policy row, not yet validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: Uuid,
    pub order: i64,
    pub owner_id: Option<String>,
    pub purpose: String,
    pub kind: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Validated, immutable policy snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,

    /// Evaluation sequence, ascending
    pub order: i64,

    pub scope: PolicyScope,

    pub purpose: Purpose,

    pub rule: PolicyRule,

    pub description: String,

    pub created_at: DateTime<Utc>,
}

impl Policy {
    pub fn is_public(&self) -> bool {
        self.scope.is_public()
    }

    pub fn kind(&self) -> PolicyKind {
        self.rule.kind()
    }

    /// Project back to the persisted shape
    pub fn to_record(&self) -> PolicyRecord {
        PolicyRecord {
            id: self.id,
            order: self.order,
            owner_id: self.scope.owner_id().map(str::to_string),
            purpose: self.purpose.as_str().to_string(),
            kind: self.rule.kind().as_str().to_string(),
            subject: self.rule.subject().to_string(),
            description: self.description.clone(),
            created_at: self.created_at,
        }
    }
}

impl TryFrom<PolicyRecord> for Policy {
    type Error = TypeError;

    fn try_from(record: PolicyRecord) -> Result<Self> {
        let kind: PolicyKind = record.kind.parse()?;
        let purpose: Purpose = record.purpose.parse()?;
        let rule = PolicyRule::new(kind, &record.subject)?;

        Ok(Self {
            id: record.id,
            order: record.order,
            scope: PolicyScope::from_owner(record.owner_id),
            purpose,
            rule,
            description: record.description,
            created_at: record.created_at,
        })
    }
}

/// Builder for policies created by administrative surfaces
#[derive(Debug, Clone)]
pub struct NewPolicy {
    order: i64,
    scope: PolicyScope,
    purpose: Purpose,
    kind: String,
    subject: String,
    description: String,
}

impl NewPolicy {
    /// Start an instance-wide federated-block policy
    pub fn instance(order: i64, kind: impl Into<String>) -> Self {
        Self {
            order,
            scope: PolicyScope::Instance,
            purpose: Purpose::FederatedBlock,
            kind: kind.into(),
            subject: String::new(),
            description: String::new(),
        }
    }

    /// Start a federated-block policy owned by one local actor
    pub fn for_actor(owner_id: impl Into<String>, order: i64, kind: impl Into<String>) -> Self {
        Self {
            scope: PolicyScope::Actor {
                owner_id: owner_id.into(),
            },
            ..Self::instance(order, kind)
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validate and produce a record with a fresh id
    pub fn build(self) -> Result<PolicyRecord> {
        let record = PolicyRecord {
            id: Uuid::new_v4(),
            order: self.order,
            owner_id: self.scope.owner_id().map(str::to_string),
            purpose: self.purpose.as_str().to_string(),
            kind: self.kind,
            subject: self.subject,
            description: self.description,
            created_at: Utc::now(),
        };
        Policy::try_from(record.clone())?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, subject: &str) -> PolicyRecord {
        PolicyRecord {
            id: Uuid::new_v4(),
            order: 0,
            owner_id: None,
            purpose: "federated_block".into(),
            kind: kind.into(),
            subject: subject.into(),
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_kind_wire_strings() {
        for kind in PolicyKind::ALL {
            assert_eq!(kind.as_str().parse::<PolicyKind>().unwrap(), kind);
        }
        assert!(matches!(
            "Always_Grant".parse::<PolicyKind>(),
            Err(TypeError::UnknownPolicyKind(_))
        ));
        assert!(matches!(
            "block_everything".parse::<PolicyKind>(),
            Err(TypeError::UnknownPolicyKind(_))
        ));
    }

    #[test]
    fn test_record_to_policy() {
        let policy = Policy::try_from(record("instance_deny", "bad.example")).unwrap();
        assert_eq!(policy.rule, PolicyRule::InstanceDeny("bad.example".into()));
        assert!(policy.is_public());
        assert_eq!(policy.scope.owner_id(), None);
    }

    #[test]
    fn test_owner_makes_policy_private() {
        let mut rec = record("actor_grant", "https://friend.example/users/ann");
        rec.owner_id = Some("alice".into());
        let policy = Policy::try_from(rec.clone()).unwrap();
        assert!(!policy.is_public());
        assert_eq!(policy.scope.owner_id(), Some("alice"));
        assert!(policy.scope.covers("alice"));
        assert!(!policy.scope.covers("bob"));
        assert_eq!(policy.to_record(), rec);
    }

    #[test]
    fn test_unknown_kind_is_rejected_at_load() {
        let err = Policy::try_from(record("maybe_grant", "")).unwrap_err();
        assert_eq!(err, TypeError::UnknownPolicyKind("maybe_grant".into()));
    }

    #[test]
    fn test_subject_required_for_matching_kinds() {
        let err = Policy::try_from(record("actor_deny", "  ")).unwrap_err();
        assert!(matches!(err, TypeError::MissingSubject { .. }));
        assert!(Policy::try_from(record("always_deny", "")).is_ok());
    }

    #[test]
    fn test_actor_subjects_take_parsed_form() {
        let bare = PolicyRule::new(PolicyKind::ActorGrant, "https://friend.example").unwrap();
        assert_eq!(bare.subject(), "https://friend.example/");

        let port = PolicyRule::new(PolicyKind::ActorDeny, "https://Bad.Example:443/users/m").unwrap();
        assert_eq!(port.subject(), "https://bad.example/users/m");
    }

    #[test]
    fn test_instance_subjects_are_lowercased() {
        let rule = PolicyRule::new(PolicyKind::InstanceDeny, "Bad.Example").unwrap();
        assert_eq!(rule, PolicyRule::InstanceDeny("bad.example".into()));
    }

    #[test]
    fn test_unparsable_subjects_are_rejected() {
        for (kind, subject) in [
            (PolicyKind::ActorDeny, "not an iri"),
            (PolicyKind::InstanceDeny, "https://bad.example/"),
            (PolicyKind::InstanceGrant, "good.example:8080"),
        ] {
            assert!(matches!(
                PolicyRule::new(kind, subject),
                Err(TypeError::InvalidSubject { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_purpose_is_rejected() {
        let mut rec = record("always_grant", "");
        rec.purpose = "outbound_block".into();
        assert!(matches!(
            Policy::try_from(rec),
            Err(TypeError::UnknownPurpose(_))
        ));
    }

    #[test]
    fn test_rule_serde_shape() {
        let rule = PolicyRule::InstanceGrant("good.example".into());
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "instance_grant", "subject": "good.example"})
        );
    }

    #[test]
    fn test_new_policy_builder() {
        let rec = NewPolicy::for_actor("alice", 3, "actor_deny")
            .with_subject("https://bad.example/users/mallory")
            .with_description("mute mallory")
            .build()
            .unwrap();
        assert_eq!(rec.owner_id.as_deref(), Some("alice"));
        assert_eq!(rec.order, 3);
        assert_eq!(rec.purpose, "federated_block");

        assert!(NewPolicy::instance(1, "instance_grant").build().is_err());
    }
}

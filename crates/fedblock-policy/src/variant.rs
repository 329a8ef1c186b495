//! Policy variant evaluators
//!
//! Each [`PolicyRule`] maps the sender identities of an activity to a
//! [`Verdict`]. Evaluation is pure: no I/O, no shared state, safe to call
//! from any thread. Identities are scanned in the order the caller supplied
//! and the first match wins.

use fedblock_types::{ActorIri, Permit, Policy, PolicyRule};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permit plus the reason recorded in the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub permit: Permit,
    pub reason: String,
}

impl Verdict {
    pub fn new(permit: Permit, reason: impl Into<String>) -> Self {
        Self {
            permit,
            reason: reason.into(),
        }
    }
}

/// Maps sender identities and activity type to a verdict
pub trait Resolve {
    fn resolve(&self, from: &[ActorIri], activity_type: &str) -> Verdict;
}

/// A policy the set evaluator can iterate over
pub trait ResolvePolicy: Resolve {
    fn policy_id(&self) -> Uuid;

    /// Evaluation sequence, ascending
    fn order(&self) -> i64;

    fn is_public(&self) -> bool;
}

impl Resolve for PolicyRule {
    fn resolve(&self, from: &[ActorIri], _activity_type: &str) -> Verdict {
        match self {
            Self::AlwaysGrant => Verdict::new(Permit::Grant, "policy always grants"),
            Self::AlwaysDeny => Verdict::new(Permit::Deny, "policy always denies"),
            Self::InstanceGrant(host) => match first_on_host(from, host) {
                Some(actor) => Verdict::new(
                    Permit::Grant,
                    format!("actor {actor} is on granted instance {host}"),
                ),
                None => Verdict::new(
                    Permit::Unknown,
                    format!("no sending actor is on instance {host}"),
                ),
            },
            Self::InstanceDeny(host) => match first_on_host(from, host) {
                Some(actor) => Verdict::new(
                    Permit::Deny,
                    format!("actor {actor} is on denied instance {host}"),
                ),
                None => Verdict::new(
                    Permit::Unknown,
                    format!("no sending actor is on instance {host}"),
                ),
            },
            Self::ActorGrant(subject) => match first_exact(from, subject) {
                Some(actor) => Verdict::new(Permit::Grant, format!("actor {actor} is granted")),
                None => Verdict::new(
                    Permit::Unknown,
                    format!("no sending actor matches {subject}"),
                ),
            },
            Self::ActorDeny(subject) => match first_exact(from, subject) {
                Some(actor) => Verdict::new(Permit::Deny, format!("actor {actor} is denied")),
                None => Verdict::new(
                    Permit::Unknown,
                    format!("no sending actor matches {subject}"),
                ),
            },
        }
    }
}

fn first_on_host<'a>(from: &'a [ActorIri], host: &str) -> Option<&'a ActorIri> {
    from.iter().find(|actor| actor.host() == Some(host))
}

fn first_exact<'a>(from: &'a [ActorIri], subject: &str) -> Option<&'a ActorIri> {
    from.iter().find(|actor| actor.as_str() == subject)
}

impl Resolve for Policy {
    fn resolve(&self, from: &[ActorIri], activity_type: &str) -> Verdict {
        self.rule.resolve(from, activity_type)
    }
}

impl ResolvePolicy for Policy {
    fn policy_id(&self) -> Uuid {
        self.id
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn is_public(&self) -> bool {
        self.scope.is_public()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actors(iris: &[&str]) -> Vec<ActorIri> {
        iris.iter().map(|iri| ActorIri::parse(iri).unwrap()).collect()
    }

    #[test]
    fn test_unconditional_rules() {
        let from = actors(&["https://any.example/users/a"]);
        assert_eq!(
            PolicyRule::AlwaysGrant.resolve(&from, "Follow").permit,
            Permit::Grant
        );
        assert_eq!(
            PolicyRule::AlwaysDeny.resolve(&[], "Follow").permit,
            Permit::Deny
        );
    }

    #[test]
    fn test_instance_rules_match_on_host() {
        let from = actors(&["https://bad.example/users/mallory"]);

        let grant = PolicyRule::InstanceGrant("good.example".into()).resolve(&from, "Create");
        assert_eq!(grant.permit, Permit::Unknown);
        assert!(grant.reason.contains("good.example"));

        let deny = PolicyRule::InstanceDeny("bad.example".into()).resolve(&from, "Create");
        assert_eq!(deny.permit, Permit::Deny);
        assert!(deny.reason.contains("https://bad.example/users/mallory"));
    }

    #[test]
    fn test_first_match_wins_in_caller_order() {
        let from = actors(&[
            "https://other.example/users/x",
            "https://bad.example/users/first",
            "https://bad.example/users/second",
        ]);
        let verdict = PolicyRule::InstanceDeny("bad.example".into()).resolve(&from, "Like");
        assert!(verdict.reason.contains("/users/first"));
        assert!(!verdict.reason.contains("/users/second"));
    }

    #[test]
    fn test_actor_rules_use_exact_string_form() {
        let from = actors(&["https://friend.example/users/ann"]);

        let hit = PolicyRule::ActorGrant("https://friend.example/users/ann".into())
            .resolve(&from, "Follow");
        assert_eq!(hit.permit, Permit::Grant);

        let miss = PolicyRule::ActorDeny("https://friend.example/users/ann/".into())
            .resolve(&from, "Follow");
        assert_eq!(miss.permit, Permit::Unknown);
        assert!(miss.reason.contains("https://friend.example/users/ann/"));
    }

    #[test]
    fn test_loaded_subjects_match_parsed_senders() {
        use fedblock_types::PolicyKind;

        let bare = PolicyRule::new(PolicyKind::ActorGrant, "https://friend.example").unwrap();
        let verdict = bare.resolve(&actors(&["https://friend.example"]), "Follow");
        assert_eq!(verdict.permit, Permit::Grant);

        let port = PolicyRule::new(PolicyKind::ActorDeny, "https://bad.example:443/users/m").unwrap();
        let verdict = port.resolve(&actors(&["https://bad.example/users/m"]), "Follow");
        assert_eq!(verdict.permit, Permit::Deny);

        let mixed = PolicyRule::new(PolicyKind::InstanceDeny, "Bad.Example").unwrap();
        let verdict = mixed.resolve(&actors(&["https://BAD.example/users/m"]), "Create");
        assert_eq!(verdict.permit, Permit::Deny);
    }

    #[test]
    fn test_empty_identities_never_match() {
        for rule in [
            PolicyRule::InstanceGrant("a.example".into()),
            PolicyRule::InstanceDeny("a.example".into()),
            PolicyRule::ActorGrant("https://a.example/u".into()),
            PolicyRule::ActorDeny("https://a.example/u".into()),
        ] {
            assert_eq!(rule.resolve(&[], "Announce").permit, Permit::Unknown);
        }
    }
}

//! Resolution audit records
//!
//! One resolution is produced per policy actually evaluated. Records are
//! append-only; a redelivered activity produces a fresh set of records
//! rather than touching the earlier ones.

use crate::iri::ActivityId;
use crate::permit::Permit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit record of one policy verdict for one activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub id: Uuid,

    /// Position of the originating policy within the evaluated set
    pub order: u32,

    pub permit: Permit,

    pub activity_id: ActivityId,

    /// Local actor the activity was addressed to
    pub target_user_id: String,

    pub is_public: bool,

    pub policy_id: Uuid,

    /// Human-readable explanation of the verdict
    pub reason: String,

    pub created_at: DateTime<Utc>,
}

impl Resolution {
    pub fn new(
        order: u32,
        permit: Permit,
        activity_id: ActivityId,
        target_user_id: impl Into<String>,
        is_public: bool,
        policy_id: Uuid,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order,
            permit,
            activity_id,
            target_user_id: target_user_id.into(),
            is_public,
            policy_id,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_resolution_gets_its_own_id() {
        let activity = ActivityId::parse("https://remote.example/activities/7").unwrap();
        let policy_id = Uuid::new_v4();
        let first = Resolution::new(0, Permit::Deny, activity.clone(), "alice", true, policy_id, "x");
        let second = Resolution::new(0, Permit::Deny, activity, "alice", true, policy_id, "x");
        assert_ne!(first.id, second.id);
        assert_eq!(first.policy_id, second.policy_id);
    }

    #[test]
    fn test_json_payload() {
        let activity = ActivityId::parse("https://remote.example/activities/7").unwrap();
        let resolution = Resolution::new(
            1,
            Permit::Grant,
            activity,
            "alice",
            false,
            Uuid::nil(),
            "actor is granted",
        );
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["permit"], "grant");
        assert_eq!(json["order"], 1);
        assert_eq!(json["activity_id"], "https://remote.example/activities/7");
        assert_eq!(json["is_public"], false);
    }
}

//! Inbound activity under evaluation

use fedblock_types::{ActivityId, ActorIri};
use serde::{Deserialize, Serialize};

/// An inbound federated activity as seen by the blocking decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundActivity {
    /// Local actor the activity is addressed to
    pub target_user_id: String,

    /// Sender identities, in the order the caller supplied them
    pub from: Vec<ActorIri>,

    pub activity_id: ActivityId,

    pub activity_type: String,
}

impl InboundActivity {
    pub fn new(
        target_user_id: impl Into<String>,
        from: Vec<ActorIri>,
        activity_id: ActivityId,
        activity_type: impl Into<String>,
    ) -> Self {
        Self {
            target_user_id: target_user_id.into(),
            from,
            activity_id,
            activity_type: activity_type.into(),
        }
    }
}

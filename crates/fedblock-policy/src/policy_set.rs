//! Ordered, validated policy collections

use crate::error::{BlockError, Result};
use crate::variant::ResolvePolicy;
use fedblock_types::{Policy, PolicyRecord};
use tracing::warn;

/// Non-empty policy collection sorted strictly ascending by order
#[derive(Debug, Clone)]
pub struct PolicySet<P = Policy> {
    policies: Vec<P>,
}

impl PolicySet<Policy> {
    /// Validate persisted records into an evaluable set
    ///
    /// Any unrecognised kind or purpose fails the whole load.
    pub fn load(records: Vec<PolicyRecord>) -> Result<Self> {
        let policies = records
            .into_iter()
            .map(|record| {
                let id = record.id;
                Policy::try_from(record).map_err(|e| {
                    warn!(policy_id = %id, error = %e, "Rejecting invalid policy");
                    BlockError::configuration(format!("policy {id}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(policies)
    }
}

impl<P: ResolvePolicy> PolicySet<P> {
    pub fn new(mut policies: Vec<P>) -> Result<Self> {
        if policies.is_empty() {
            warn!("No policies to evaluate");
            return Err(BlockError::configuration("no policies to evaluate"));
        }

        policies.sort_by_key(|policy| policy.order());
        if let Some(pair) = policies
            .windows(2)
            .find(|pair| pair[0].order() == pair[1].order())
        {
            warn!(order = pair[0].order(), "Duplicate policy order");
            return Err(BlockError::configuration(format!(
                "policies {} and {} share order {}",
                pair[0].policy_id(),
                pair[1].policy_id(),
                pair[0].order()
            )));
        }

        Ok(Self { policies })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// True when the set holds no policies
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn into_inner(self) -> Vec<P> {
        self.policies
    }
}

impl<'a, P> IntoIterator for &'a PolicySet<P> {
    type Item = &'a P;
    type IntoIter = std::slice::Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.policies.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(order: i64, kind: &str, subject: &str) -> PolicyRecord {
        PolicyRecord {
            id: Uuid::new_v4(),
            order,
            owner_id: None,
            purpose: "federated_block".into(),
            kind: kind.into(),
            subject: subject.into(),
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_load_sorts_by_order() {
        let set = PolicySet::load(vec![
            record(30, "always_grant", ""),
            record(-2, "instance_deny", "bad.example"),
            record(7, "actor_deny", "https://bad.example/users/m"),
        ])
        .unwrap();
        let orders = set.iter().map(|p| p.order).collect::<Vec<_>>();
        assert_eq!(orders, vec![-2, 7, 30]);
    }

    #[test]
    fn test_empty_is_configuration_error() {
        let err = PolicySet::load(Vec::new()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no policies to evaluate"));
    }

    #[test]
    fn test_duplicate_order_is_configuration_error() {
        let err = PolicySet::load(vec![
            record(1, "always_grant", ""),
            record(1, "always_deny", ""),
        ])
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_kind_fails_whole_load() {
        let err = PolicySet::load(vec![
            record(1, "always_grant", ""),
            record(2, "always_maybe", ""),
        ])
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("always_maybe"));
    }
}

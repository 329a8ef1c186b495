//! Blocking decision service
//!
//! Entry point for delivery paths: given an inbound activity, decide
//! whether it is blocked for the target user. Policies are read fresh on
//! every call inside the same transaction that records the resolutions.

use crate::activity::InboundActivity;
use crate::cancellation::Cancellation;
use crate::error::{BlockError, Result};
use crate::evaluator::{Evaluation, PolicySetEvaluator};
use crate::policy_set::PolicySet;
use crate::unit_of_work::{run_in_transaction, UnitOfWork};
use async_trait::async_trait;
use fedblock_storage::{StorageTransaction, TransactionalStorage};
use fedblock_types::{ActivityId, ActorIri, Purpose};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Blocking decision over a transactional store
pub struct BlockingService<S> {
    storage: Arc<S>,
    evaluator: PolicySetEvaluator,
}

impl<S> Clone for BlockingService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            evaluator: self.evaluator,
        }
    }
}

impl<S: TransactionalStorage> BlockingService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            evaluator: PolicySetEvaluator::new(),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Decide whether an activity is blocked for `target_user_id`
    ///
    /// Any error means the activity must not be delivered.
    pub async fn is_blocked(
        &self,
        target_user_id: &str,
        from: &[ActorIri],
        activity_id: &str,
        activity_type: &str,
    ) -> Result<bool> {
        self.is_blocked_with_cancellation(
            target_user_id,
            from,
            activity_id,
            activity_type,
            &Cancellation::never(),
        )
        .await
    }

    pub async fn is_blocked_with_cancellation(
        &self,
        target_user_id: &str,
        from: &[ActorIri],
        activity_id: &str,
        activity_type: &str,
        cancellation: &Cancellation,
    ) -> Result<bool> {
        let activity_id = ActivityId::parse(activity_id).map_err(|e| {
            warn!(activity_id, error = %e, "Rejecting malformed activity id");
            BlockError::from(e)
        })?;
        let activity =
            InboundActivity::new(target_user_id, from.to_vec(), activity_id, activity_type);

        // Resolutions are committed before an unknown outcome is raised.
        self.evaluate(&activity, cancellation)
            .await?
            .blocked()
            .map_err(|e| {
                warn!(
                    activity_id = %activity.activity_id,
                    target_user_id = %activity.target_user_id,
                    error = %e,
                    "Policy set reached no decision"
                );
                e
            })
    }

    /// Evaluate and record in one transaction, returning the committed evaluation
    #[instrument(
        skip(self, activity, cancellation),
        fields(activity_id = %activity.activity_id, target_user_id = %activity.target_user_id)
    )]
    pub async fn evaluate(
        &self,
        activity: &InboundActivity,
        cancellation: &Cancellation,
    ) -> Result<Evaluation> {
        let work = EvaluateActivity {
            evaluator: self.evaluator,
            activity,
            cancellation,
        };
        run_in_transaction(self.storage.as_ref(), cancellation, &work).await
    }
}

struct EvaluateActivity<'a> {
    evaluator: PolicySetEvaluator,
    activity: &'a InboundActivity,
    cancellation: &'a Cancellation,
}

#[async_trait]
impl<'a, Tx: StorageTransaction> UnitOfWork<Tx> for EvaluateActivity<'a> {
    type Output = Evaluation;

    async fn run(&self, tx: &mut Tx) -> Result<Evaluation> {
        let records = tx
            .ordered_policies(&self.activity.target_user_id, Purpose::FederatedBlock)
            .await?;
        let set = PolicySet::load(records)?;
        self.evaluator
            .evaluate_and_record(tx, &set, self.activity, self.cancellation)
            .await
    }
}

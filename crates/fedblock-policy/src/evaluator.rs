//! Policy set evaluator
//!
//! Policies are consulted in ascending order. Each verdict is folded into
//! the running permit with [`Permit::compose`]; the first deny stops the
//! walk since nothing can override it. One resolution is produced for
//! every policy actually consulted, and the whole batch is written in a
//! single call to the sink.

use crate::activity::InboundActivity;
use crate::cancellation::Cancellation;
use crate::error::{BlockError, Result};
use crate::policy_set::PolicySet;
use crate::variant::ResolvePolicy;
use fedblock_storage::ResolutionSink;
use fedblock_types::{Permit, Resolution};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Outcome of walking a policy set for one activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Composition of every verdict produced
    pub outcome: Permit,

    /// True when a deny stopped the walk before the last policy
    pub short_circuited: bool,

    /// One record per consulted policy, in evaluation order
    pub resolutions: Vec<Resolution>,
}

impl Evaluation {
    /// Map the composed outcome to a blocking decision
    ///
    /// An unknown outcome means the configured policies never reached a
    /// decision, which is a configuration error rather than a pass.
    pub fn blocked(&self) -> Result<bool> {
        match self.outcome {
            Permit::Deny => Ok(true),
            Permit::Grant => Ok(false),
            Permit::Unknown => Err(BlockError::configuration(
                "unknown resolution after evaluating all policies",
            )),
        }
    }
}

/// Stateless evaluator over ordered policy sets
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicySetEvaluator;

impl PolicySetEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Walk the set and write the produced resolutions to `sink`
    ///
    /// The cancellation signal is checked before each policy and before
    /// the write. Nothing reaches the sink unless the walk completes.
    pub async fn evaluate_and_record<P, S>(
        &self,
        sink: &mut S,
        set: &PolicySet<P>,
        activity: &InboundActivity,
        cancellation: &Cancellation,
    ) -> Result<Evaluation>
    where
        P: ResolvePolicy,
        S: ResolutionSink + ?Sized,
    {
        let evaluation = walk(set, activity, cancellation)?;

        cancellation.check()?;
        sink.insert_resolutions(&evaluation.resolutions)
            .await
            .map_err(|e| {
                warn!(
                    activity_id = %activity.activity_id,
                    error = %e,
                    "Failed to record resolutions"
                );
                BlockError::from(e)
            })?;

        info!(
            activity_id = %activity.activity_id,
            target_user_id = %activity.target_user_id,
            outcome = %evaluation.outcome,
            evaluated = evaluation.resolutions.len(),
            "Policy set evaluated"
        );
        Ok(evaluation)
    }

    /// Evaluate, record, and map the outcome to a blocking decision
    pub async fn is_blocked<P, S>(
        &self,
        sink: &mut S,
        set: &PolicySet<P>,
        activity: &InboundActivity,
        cancellation: &Cancellation,
    ) -> Result<bool>
    where
        P: ResolvePolicy,
        S: ResolutionSink + ?Sized,
    {
        self.evaluate_and_record(sink, set, activity, cancellation)
            .await?
            .blocked()
    }
}

/// Consult policies in order until the outcome can no longer change
fn walk<P: ResolvePolicy>(
    set: &PolicySet<P>,
    activity: &InboundActivity,
    cancellation: &Cancellation,
) -> Result<Evaluation> {
    let mut outcome = Permit::Unknown;
    let mut resolutions = Vec::with_capacity(set.len());
    for (index, policy) in set.iter().enumerate() {
        cancellation.check()?;
        let resolution = resolve_one(index, policy, activity);
        outcome = outcome.compose(resolution.permit);
        resolutions.push(resolution);
        if outcome.is_absorbing() {
            break;
        }
    }
    Ok(Evaluation {
        outcome,
        short_circuited: resolutions.len() < set.len(),
        resolutions,
    })
}

fn resolve_one<P: ResolvePolicy>(
    index: usize,
    policy: &P,
    activity: &InboundActivity,
) -> Resolution {
    let verdict = policy.resolve(&activity.from, &activity.activity_type);
    debug!(
        policy_id = %policy.policy_id(),
        order = policy.order(),
        permit = %verdict.permit,
        activity_id = %activity.activity_id,
        "Policy resolved"
    );
    Resolution::new(
        index as u32,
        verdict.permit,
        activity.activity_id.clone(),
        activity.target_user_id.clone(),
        policy.is_public(),
        policy.policy_id(),
        verdict.reason,
    )
}

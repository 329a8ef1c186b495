//! Transaction scoping for blocking decisions
//!
//! The runner owns the transaction: it begins it, lends it to the work,
//! and commits only when the work succeeds and the signal is still clear.
//! Any error rolls back. A future dropped mid-flight drops the
//! transaction, which discards its writes.

use crate::cancellation::Cancellation;
use crate::error::Result;
use async_trait::async_trait;
use fedblock_storage::{StorageTransaction, TransactionalStorage};
use tracing::{debug, warn};

/// Work executed inside one storage transaction
#[async_trait]
pub trait UnitOfWork<Tx: StorageTransaction>: Sync {
    type Output: Send;

    async fn run(&self, tx: &mut Tx) -> Result<Self::Output>;
}

/// Run `work` in a fresh transaction of `storage`
pub async fn run_in_transaction<S, W>(
    storage: &S,
    cancellation: &Cancellation,
    work: &W,
) -> Result<W::Output>
where
    S: TransactionalStorage + ?Sized,
    W: UnitOfWork<S::Tx> + ?Sized,
{
    cancellation.check()?;
    let mut tx = storage.begin().await?;

    let outcome = match work.run(&mut tx).await {
        Ok(output) => cancellation.check().map(|()| output),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(output) => {
            tx.commit().await?;
            debug!("Unit of work committed");
            Ok(output)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            debug!(error = %e, "Unit of work rolled back");
            Err(e)
        }
    }
}

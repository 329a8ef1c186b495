use crate::StorageResult;
use async_trait::async_trait;
use fedblock_types::{ActivityId, PolicyRecord, Purpose, Resolution};
use uuid::Uuid;

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Source of the ordered policy collection for one evaluation.
#[async_trait]
pub trait PolicyStore: Send {
    /// Instance-wide policies plus the policies owned by `scope_key`,
    /// restricted to `purpose`, ascending by order.
    async fn ordered_policies(
        &mut self,
        scope_key: &str,
        purpose: Purpose,
    ) -> StorageResult<Vec<PolicyRecord>>;
}

/// Append-only sink for resolution audit records.
#[async_trait]
pub trait ResolutionSink: Send {
    /// Write one evaluation's full batch of resolutions.
    async fn insert_resolutions(&mut self, resolutions: &[Resolution]) -> StorageResult<()>;
}

/// A unit of work over the policy store and the resolution sink.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait StorageTransaction: PolicyStore + ResolutionSink + Send + Sized {
    async fn commit(self) -> StorageResult<()>;
    async fn rollback(self) -> StorageResult<()>;
}

/// Storage that can open transactions.
#[async_trait]
pub trait TransactionalStorage: Send + Sync {
    type Tx: StorageTransaction;

    async fn begin(&self) -> StorageResult<Self::Tx>;
}

/// Administrative policy surface, outside the evaluation path.
#[async_trait]
pub trait PolicyAdmin: Send + Sync {
    /// Insert a policy. Fails with `Conflict` when the id exists or when the
    /// order collides with a policy evaluated alongside it.
    async fn create_policy(&self, record: PolicyRecord) -> StorageResult<()>;

    /// List policies ascending by order.
    async fn list_policies(&self, window: QueryWindow) -> StorageResult<Vec<PolicyRecord>>;

    async fn delete_policy(&self, id: Uuid) -> StorageResult<()>;
}

/// Read access to the resolution audit trail. There is no update or delete.
#[async_trait]
pub trait ResolutionLog: Send + Sync {
    /// All resolutions recorded for an activity, oldest first.
    async fn resolutions_for_activity(
        &self,
        activity_id: &ActivityId,
    ) -> StorageResult<Vec<Resolution>>;

    /// Read resolutions newest-first.
    async fn list_resolutions(&self, window: QueryWindow) -> StorageResult<Vec<Resolution>>;
}

/// Storage bundle used by Fedblock surfaces.
pub trait FedblockStorage: TransactionalStorage + PolicyAdmin + ResolutionLog {}

impl<T> FedblockStorage for T where T: TransactionalStorage + PolicyAdmin + ResolutionLog {}

/// Two scopes are evaluated together when either is instance-wide or both
/// belong to the same owner.
pub(crate) fn scopes_overlap(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

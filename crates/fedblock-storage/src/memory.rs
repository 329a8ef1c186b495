//! In-memory reference implementation for Fedblock storage traits.
//!
//! This adapter is deterministic and test-friendly. Transactions stage their
//! resolution writes and apply them on commit; an uncommitted transaction
//! leaves no trace. Production deployments should use the PostgreSQL
//! adapter.

use crate::traits::{
    scopes_overlap, PolicyAdmin, PolicyStore, QueryWindow, ResolutionLog, ResolutionSink,
    StorageTransaction, TransactionalStorage,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use fedblock_types::{ActivityId, PolicyRecord, Purpose, Resolution};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    policies: RwLock<Vec<PolicyRecord>>,
    resolutions: RwLock<Vec<Resolution>>,
    fail_next_policy_read: AtomicBool,
    fail_next_resolution_write: AtomicBool,
    fail_next_commit: AtomicBool,
    policy_reads: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// In-memory Fedblock storage adapter.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Inner>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next policy read fail with a backend error.
    pub fn fail_next_policy_read(&self) {
        self.inner.fail_next_policy_read.store(true, Ordering::SeqCst);
    }

    /// Make the next resolution write fail with a backend error.
    pub fn fail_next_resolution_write(&self) {
        self.inner
            .fail_next_resolution_write
            .store(true, Ordering::SeqCst);
    }

    /// Make the next commit fail with a backend error.
    pub fn fail_next_commit(&self) {
        self.inner.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of policy collection reads served so far.
    pub fn policy_reads(&self) -> usize {
        self.inner.policy_reads.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    /// Number of committed resolutions.
    pub fn resolution_count(&self) -> StorageResult<usize> {
        let guard = self
            .inner
            .resolutions
            .read()
            .map_err(|_| StorageError::Backend("resolutions lock poisoned".to_string()))?;
        Ok(guard.len())
    }
}

/// Transaction over [`InMemoryStorage`].
pub struct InMemoryTransaction {
    inner: Arc<Inner>,
    staged: Vec<Resolution>,
}

impl InMemoryTransaction {
    /// Resolutions written in this transaction and not yet committed.
    pub fn staged(&self) -> &[Resolution] {
        &self.staged
    }
}

#[async_trait]
impl TransactionalStorage for InMemoryStorage {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> StorageResult<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            inner: Arc::clone(&self.inner),
            staged: Vec::new(),
        })
    }
}

#[async_trait]
impl PolicyStore for InMemoryTransaction {
    async fn ordered_policies(
        &mut self,
        scope_key: &str,
        purpose: Purpose,
    ) -> StorageResult<Vec<PolicyRecord>> {
        if self.inner.fail_next_policy_read.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Backend(
                "injected policy read failure".to_string(),
            ));
        }
        self.inner.policy_reads.fetch_add(1, Ordering::SeqCst);

        let guard = self
            .inner
            .policies
            .read()
            .map_err(|_| StorageError::Backend("policies lock poisoned".to_string()))?;
        let mut values = guard
            .iter()
            .filter(|record| record.purpose == purpose.as_str())
            .filter(|record| {
                record
                    .owner_id
                    .as_deref()
                    .map_or(true, |owner| owner == scope_key)
            })
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
        Ok(values)
    }
}

#[async_trait]
impl ResolutionSink for InMemoryTransaction {
    async fn insert_resolutions(&mut self, resolutions: &[Resolution]) -> StorageResult<()> {
        if self
            .inner
            .fail_next_resolution_write
            .swap(false, Ordering::SeqCst)
        {
            return Err(StorageError::Backend(
                "injected resolution write failure".to_string(),
            ));
        }
        self.staged.extend_from_slice(resolutions);
        Ok(())
    }
}

#[async_trait]
impl StorageTransaction for InMemoryTransaction {
    async fn commit(self) -> StorageResult<()> {
        if self.inner.fail_next_commit.swap(false, Ordering::SeqCst) {
            self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Backend("injected commit failure".to_string()));
        }

        let mut guard = self
            .inner
            .resolutions
            .write()
            .map_err(|_| StorageError::Backend("resolutions lock poisoned".to_string()))?;
        guard.extend(self.staged);
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> StorageResult<()> {
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PolicyAdmin for InMemoryStorage {
    async fn create_policy(&self, record: PolicyRecord) -> StorageResult<()> {
        let mut guard = self
            .inner
            .policies
            .write()
            .map_err(|_| StorageError::Backend("policies lock poisoned".to_string()))?;

        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(StorageError::Conflict(format!(
                "policy {} already exists",
                record.id
            )));
        }
        if let Some(clash) = guard.iter().find(|existing| {
            existing.purpose == record.purpose
                && existing.order == record.order
                && scopes_overlap(existing.owner_id.as_deref(), record.owner_id.as_deref())
        }) {
            return Err(StorageError::Conflict(format!(
                "order {} is already used by policy {}",
                record.order, clash.id
            )));
        }

        guard.push(record);
        Ok(())
    }

    async fn list_policies(&self, window: QueryWindow) -> StorageResult<Vec<PolicyRecord>> {
        let guard = self
            .inner
            .policies
            .read()
            .map_err(|_| StorageError::Backend("policies lock poisoned".to_string()))?;
        let mut values = guard.clone();
        values.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
        Ok(apply_window(values, window))
    }

    async fn delete_policy(&self, id: Uuid) -> StorageResult<()> {
        let mut guard = self
            .inner
            .policies
            .write()
            .map_err(|_| StorageError::Backend("policies lock poisoned".to_string()))?;
        let before = guard.len();
        guard.retain(|record| record.id != id);
        if guard.len() == before {
            return Err(StorageError::NotFound(format!("policy {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl ResolutionLog for InMemoryStorage {
    async fn resolutions_for_activity(
        &self,
        activity_id: &ActivityId,
    ) -> StorageResult<Vec<Resolution>> {
        let guard = self
            .inner
            .resolutions
            .read()
            .map_err(|_| StorageError::Backend("resolutions lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|resolution| &resolution.activity_id == activity_id)
            .cloned()
            .collect())
    }

    async fn list_resolutions(&self, window: QueryWindow) -> StorageResult<Vec<Resolution>> {
        let guard = self
            .inner
            .resolutions
            .read()
            .map_err(|_| StorageError::Backend("resolutions lock poisoned".to_string()))?;
        let values = guard.iter().rev().cloned().collect::<Vec<_>>();
        Ok(apply_window(values, window))
    }
}

fn apply_window<T>(values: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = values.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

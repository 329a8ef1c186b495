//! PostgreSQL adapter for Fedblock storage.
//!
//! Policy reads and resolution writes for one evaluation run inside a single
//! `sqlx` transaction. Resolutions are insert-only; no statement in this
//! module updates or deletes them.

use crate::traits::{
    PolicyAdmin, PolicyStore, QueryWindow, ResolutionLog, ResolutionSink, StorageTransaction,
    TransactionalStorage,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use fedblock_types::{ActivityId, Permit, PolicyRecord, Purpose, Resolution};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

/// PostgreSQL-backed storage adapter.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS fedblock_policies (
                id UUID PRIMARY KEY,
                policy_order BIGINT NOT NULL,
                owner_id TEXT,
                purpose TEXT NOT NULL,
                kind TEXT NOT NULL,
                subject TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS fedblock_policies_purpose_owner
                ON fedblock_policies (purpose, owner_id, policy_order)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS fedblock_resolutions (
                id UUID PRIMARY KEY,
                resolution_order INTEGER NOT NULL,
                permit TEXT NOT NULL,
                activity_id TEXT NOT NULL,
                target_user_id TEXT NOT NULL,
                is_public BOOLEAN NOT NULL,
                policy_id UUID NOT NULL,
                reason TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS fedblock_resolutions_activity
                ON fedblock_resolutions (activity_id, created_at)
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

/// Transaction over [`PostgresStorage`]. Dropping it rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionalStorage for PostgresStorage {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> StorageResult<PostgresTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(PostgresTransaction { tx })
    }
}

#[async_trait]
impl PolicyStore for PostgresTransaction {
    async fn ordered_policies(
        &mut self,
        scope_key: &str,
        purpose: Purpose,
    ) -> StorageResult<Vec<PolicyRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, policy_order, owner_id, purpose, kind, subject, description, created_at
              FROM fedblock_policies
             WHERE purpose = $1
               AND (owner_id IS NULL OR owner_id = $2)
             ORDER BY policy_order ASC, created_at ASC
            "#,
        )
        .bind(purpose.as_str())
        .bind(scope_key)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(policy_row_to_record).collect()
    }
}

#[async_trait]
impl ResolutionSink for PostgresTransaction {
    async fn insert_resolutions(&mut self, resolutions: &[Resolution]) -> StorageResult<()> {
        for resolution in resolutions {
            let order = i32::try_from(resolution.order).map_err(|_| {
                StorageError::InvalidInput(format!(
                    "resolution order {} out of range",
                    resolution.order
                ))
            })?;

            sqlx::query(
                r#"
                INSERT INTO fedblock_resolutions
                    (id, resolution_order, permit, activity_id, target_user_id, is_public, policy_id, reason, created_at)
                VALUES
                    ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(resolution.id)
            .bind(order)
            .bind(resolution.permit.as_str())
            .bind(resolution.activity_id.as_str())
            .bind(&resolution.target_user_id)
            .bind(resolution.is_public)
            .bind(resolution.policy_id)
            .bind(&resolution.reason)
            .bind(resolution.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_conflict)?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageTransaction for PostgresTransaction {
    async fn commit(self) -> StorageResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn rollback(self) -> StorageResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[async_trait]
impl PolicyAdmin for PostgresStorage {
    async fn create_policy(&self, record: PolicyRecord) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        sqlx::query("LOCK TABLE fedblock_policies IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let clash = sqlx::query(
            r#"
            SELECT id FROM fedblock_policies
             WHERE purpose = $1
               AND policy_order = $2
               AND (owner_id IS NULL OR $3::TEXT IS NULL OR owner_id = $3)
             LIMIT 1
            "#,
        )
        .bind(&record.purpose)
        .bind(record.order)
        .bind(record.owner_id.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if let Some(row) = clash {
            let id: Uuid = row
                .try_get("id")
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            return Err(StorageError::Conflict(format!(
                "order {} is already used by policy {id}",
                record.order
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO fedblock_policies
                (id, policy_order, owner_id, purpose, kind, subject, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(record.order)
        .bind(record.owner_id.as_deref())
        .bind(&record.purpose)
        .bind(&record.kind)
        .bind(&record.subject)
        .bind(&record.description)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_conflict)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn list_policies(&self, window: QueryWindow) -> StorageResult<Vec<PolicyRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, policy_order, owner_id, purpose, kind, subject, description, created_at
              FROM fedblock_policies
             ORDER BY policy_order ASC, created_at ASC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit_or_all(window.limit)?)
        .bind(to_i64(window.offset)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(policy_row_to_record).collect()
    }

    async fn delete_policy(&self, id: Uuid) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM fedblock_policies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("policy {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl ResolutionLog for PostgresStorage {
    async fn resolutions_for_activity(
        &self,
        activity_id: &ActivityId,
    ) -> StorageResult<Vec<Resolution>> {
        let rows = sqlx::query(
            r#"
            SELECT id, resolution_order, permit, activity_id, target_user_id, is_public, policy_id, reason, created_at
              FROM fedblock_resolutions
             WHERE activity_id = $1
             ORDER BY created_at ASC, resolution_order ASC
            "#,
        )
        .bind(activity_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(resolution_row_to_record).collect()
    }

    async fn list_resolutions(&self, window: QueryWindow) -> StorageResult<Vec<Resolution>> {
        let rows = sqlx::query(
            r#"
            SELECT id, resolution_order, permit, activity_id, target_user_id, is_public, policy_id, reason, created_at
              FROM fedblock_resolutions
             ORDER BY created_at DESC, resolution_order DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit_or_all(window.limit)?)
        .bind(to_i64(window.offset)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(resolution_row_to_record).collect()
    }
}

fn policy_row_to_record(row: PgRow) -> StorageResult<PolicyRecord> {
    Ok(PolicyRecord {
        id: row
            .try_get("id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        order: row
            .try_get("policy_order")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        owner_id: row
            .try_get("owner_id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        purpose: row
            .try_get("purpose")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        kind: row
            .try_get("kind")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        subject: row
            .try_get("subject")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        description: row
            .try_get("description")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    })
}

fn resolution_row_to_record(row: PgRow) -> StorageResult<Resolution> {
    let order: i32 = row
        .try_get("resolution_order")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let permit: String = row
        .try_get("permit")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let activity_id: String = row
        .try_get("activity_id")
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    Ok(Resolution {
        id: row
            .try_get("id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        order: u32::try_from(order)
            .map_err(|_| StorageError::Serialization(format!("negative resolution order {order}")))?,
        permit: permit
            .parse::<Permit>()
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
        activity_id: ActivityId::parse(&activity_id)
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
        target_user_id: row
            .try_get("target_user_id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        is_public: row
            .try_get("is_public")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        policy_id: row
            .try_get("policy_id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        reason: row
            .try_get("reason")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    })
}

fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    StorageError::Backend(err.to_string())
}

fn to_i64(value: usize) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidInput("window value too large".to_string()))
}

/// A zero limit means "no limit"; Postgres accepts `LIMIT NULL` for that.
fn limit_or_all(limit: usize) -> StorageResult<Option<i64>> {
    if limit == 0 {
        Ok(None)
    } else {
        to_i64(limit).map(Some)
    }
}

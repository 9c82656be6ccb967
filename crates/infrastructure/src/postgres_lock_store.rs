//! PostgreSQL-backed lock store with a configurable table and key column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keylatch_application::LockStore;
use keylatch_core::{LockError, LockKey, LockResult, OwnerToken};
use keylatch_domain::LockRecord;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::lock_attributes::{DEFAULT_KEY_ATTRIBUTE, validate_identifier, validate_key_attribute};

/// Default table holding lock rows.
pub const DEFAULT_LOCK_TABLE: &str = "distributed_locks";

/// PostgreSQL implementation of the lock store port.
#[derive(Clone)]
pub struct PostgresLockStore {
    pool: PgPool,
    statements: LockStatements,
}

#[derive(Debug, Clone)]
struct LockStatements {
    create_table: String,
    put_if_absent_or_expired: String,
    delete_if_owner: String,
    update_expiry_if_owner: String,
    select: String,
    delete: String,
}

impl LockStatements {
    fn new(table: &str, key_column: &str) -> Self {
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    {key_column} TEXT PRIMARY KEY,
                    owner_token TEXT NOT NULL,
                    expires_at TIMESTAMPTZ NOT NULL
                )"
            ),
            put_if_absent_or_expired: format!(
                "INSERT INTO {table} ({key_column}, owner_token, expires_at)
                VALUES ($1, $2, $3)
                ON CONFLICT ({key_column}) DO UPDATE
                SET owner_token = EXCLUDED.owner_token, expires_at = EXCLUDED.expires_at
                WHERE {table}.expires_at < $4"
            ),
            delete_if_owner: format!(
                "DELETE FROM {table} WHERE {key_column} = $1 AND owner_token = $2"
            ),
            update_expiry_if_owner: format!(
                "UPDATE {table} SET expires_at = $3
                WHERE {key_column} = $1 AND owner_token = $2"
            ),
            select: format!(
                "SELECT {key_column} AS lock_key, owner_token, expires_at
                FROM {table} WHERE {key_column} = $1"
            ),
            delete: format!("DELETE FROM {table} WHERE {key_column} = $1"),
        }
    }
}

#[derive(Debug, FromRow)]
struct LockRow {
    lock_key: String,
    owner_token: String,
    expires_at: DateTime<Utc>,
}

impl LockRow {
    fn into_record(self) -> LockResult<LockRecord> {
        let malformed = |error: LockError| {
            LockError::Store(format!("malformed postgres lock row: {error}"))
        };

        Ok(LockRecord {
            key: LockKey::new(self.lock_key).map_err(malformed)?,
            owner_token: OwnerToken::new(self.owner_token).map_err(malformed)?,
            expires_at: self.expires_at,
        })
    }
}

impl PostgresLockStore {
    /// Creates a store on the default table and key column.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statements: LockStatements::new(DEFAULT_LOCK_TABLE, DEFAULT_KEY_ATTRIBUTE),
        }
    }

    /// Creates a store on a custom table and key column.
    pub fn with_layout(pool: PgPool, table: &str, key_column: &str) -> LockResult<Self> {
        let table = validate_identifier("lock table", table)?;
        let key_column = validate_key_attribute(key_column)?;

        Ok(Self {
            pool,
            statements: LockStatements::new(table.as_str(), key_column.as_str()),
        })
    }

    /// Creates the lock table when it does not exist yet.
    pub async fn ensure_schema(&self) -> LockResult<()> {
        sqlx::query(self.statements.create_table.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                LockError::Store(format!("failed to create postgres lock table: {error}"))
            })?;

        info!("postgres lock table ready");
        Ok(())
    }
}

#[async_trait]
impl LockStore for PostgresLockStore {
    async fn put_if_absent_or_expired(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> LockResult<bool> {
        let result = sqlx::query(self.statements.put_if_absent_or_expired.as_str())
            .bind(record.key.as_str())
            .bind(record.owner_token.as_str())
            .bind(record.expires_at)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|error| LockError::Store(format!("failed to write postgres lock: {error}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_if_owner(&self, key: &LockKey, owner_token: &OwnerToken) -> LockResult<bool> {
        let result = sqlx::query(self.statements.delete_if_owner.as_str())
            .bind(key.as_str())
            .bind(owner_token.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                LockError::Store(format!("failed to release postgres lock: {error}"))
            })?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_expiry_if_owner(
        &self,
        key: &LockKey,
        owner_token: &OwnerToken,
        expires_at: DateTime<Utc>,
    ) -> LockResult<bool> {
        let result = sqlx::query(self.statements.update_expiry_if_owner.as_str())
            .bind(key.as_str())
            .bind(owner_token.as_str())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                LockError::Store(format!("failed to refresh postgres lock: {error}"))
            })?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, key: &LockKey) -> LockResult<Option<LockRecord>> {
        let row = sqlx::query_as::<_, LockRow>(self.statements.select.as_str())
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| LockError::Store(format!("failed to read postgres lock: {error}")))?;

        row.map(LockRow::into_record).transpose()
    }

    async fn delete(&self, key: &LockKey) -> LockResult<()> {
        sqlx::query(self.statements.delete.as_str())
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                LockError::Store(format!("failed to delete postgres lock: {error}"))
            })?;

        Ok(())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keylatch_core::{LockKey, LockResult, OwnerToken};
use keylatch_domain::LockRecord;

/// Atomic key-value store holding one lock record per key.
///
/// Every method is a single atomic round trip. Conditional methods report a
/// failed predicate as `Ok(false)` and reserve `Err` for store failures.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Writes the record when no record exists for its key or the existing
    /// record expired strictly before `now`.
    async fn put_if_absent_or_expired(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> LockResult<bool>;

    /// Deletes the record when it is held by `owner_token`.
    async fn delete_if_owner(&self, key: &LockKey, owner_token: &OwnerToken) -> LockResult<bool>;

    /// Moves the expiry of the record when it is held by `owner_token`.
    async fn update_expiry_if_owner(
        &self,
        key: &LockKey,
        owner_token: &OwnerToken,
        expires_at: DateTime<Utc>,
    ) -> LockResult<bool>;

    /// Returns the current record, if any.
    async fn get(&self, key: &LockKey) -> LockResult<Option<LockRecord>>;

    /// Removes the record unconditionally. Deleting an absent key succeeds.
    async fn delete(&self, key: &LockKey) -> LockResult<()>;
}

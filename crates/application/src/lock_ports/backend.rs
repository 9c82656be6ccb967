use async_trait::async_trait;
use keylatch_core::LockResult;
use keylatch_domain::AcquiredLock;

/// Lock protocol over one storage substrate.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Acquires the lock without waiting.
    ///
    /// Fails with `LockError::DuplicateLock` while another live holder exists.
    async fn acquire(&self, key: &str, ttl_seconds: u32) -> LockResult<AcquiredLock>;

    /// Releases the lock held by `owner_token`.
    ///
    /// Best effort: returns false when the lock is absent, owned by another
    /// token, or the store failed.
    async fn release(&self, key: &str, owner_token: &str) -> bool;

    /// Extends the expiry of the lock held by `owner_token` to now plus ttl.
    ///
    /// Invalid input fails with `LockError::Validation` before the store is
    /// called. A rejected update or a store failure is reported as
    /// `LockError::RefreshLock`.
    async fn refresh(
        &self,
        key: &str,
        owner_token: &str,
        ttl_seconds: u32,
    ) -> LockResult<AcquiredLock>;

    /// Returns whether a live lock exists for the key.
    ///
    /// Not a pure read: an expired record found here is deleted from the store.
    async fn is_locked(&self, key: &str) -> LockResult<bool>;
}

use std::sync::Arc;

use keylatch_core::LockResult;
use keylatch_domain::AcquiredLock;
use tracing::info;

use crate::lock_ports::LockBackend;

/// Stateless lock façade where callers carry the owner token themselves.
///
/// Suited to handing a lock across process boundaries: one process acquires,
/// another refreshes or releases with the token it was given.
#[derive(Clone)]
pub struct LockClient {
    backend: Arc<dyn LockBackend>,
}

impl LockClient {
    /// Creates a client over one backend.
    #[must_use]
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self { backend }
    }

    /// Acquires the lock for `key`.
    pub async fn acquire(&self, key: &str, ttl_seconds: u32) -> LockResult<AcquiredLock> {
        let lock = self.backend.acquire(key, ttl_seconds).await?;
        info!(lock_key = %key, "acquired lock");
        Ok(lock)
    }

    /// Releases the lock held by `owner_token`. Never fails.
    pub async fn release(&self, key: &str, owner_token: &str) -> bool {
        let released = self.backend.release(key, owner_token).await;
        info!(lock_key = %key, released, "release requested");
        released
    }

    /// Extends the lock held by `owner_token`.
    pub async fn refresh(
        &self,
        key: &str,
        owner_token: &str,
        ttl_seconds: u32,
    ) -> LockResult<AcquiredLock> {
        let lock = self.backend.refresh(key, owner_token, ttl_seconds).await?;
        info!(
            lock_key = %key,
            expires_at = %lock.expires_at(),
            "refreshed lock"
        );
        Ok(lock)
    }

    /// Returns whether a live lock exists, reclaiming an expired one.
    pub async fn is_locked(&self, key: &str) -> LockResult<bool> {
        self.backend.is_locked(key).await
    }
}

//! Lock handle bound to a single key and ttl.

use std::future::Future;
use std::sync::Arc;

use keylatch_core::{LockError, LockKey, LockResult, OwnerToken};
use keylatch_domain::AcquiredLock;
use tracing::{info, warn};

use crate::lock_ports::LockBackend;

/// Handle managing one held lock on one key.
///
/// The handle caches the owner token of its last acquisition. The cache is
/// only used to issue later conditional requests; the store decides whether
/// the token still owns the key. Mutating methods take `&mut self`, so one
/// handle is never driven from two tasks at once.
pub struct ScopedLock {
    backend: Arc<dyn LockBackend>,
    key: LockKey,
    ttl_seconds: u32,
    owner_token: Option<OwnerToken>,
}

impl ScopedLock {
    /// Creates a handle for `key` acquiring with `ttl_seconds`.
    pub fn new(
        backend: Arc<dyn LockBackend>,
        key: impl Into<String>,
        ttl_seconds: u32,
    ) -> LockResult<Self> {
        if ttl_seconds == 0 {
            return Err(LockError::Validation(
                "lock ttl_seconds must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            backend,
            key: LockKey::new(key)?,
            ttl_seconds,
            owner_token: None,
        })
    }

    /// Returns the key guarded by this handle.
    #[must_use]
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Returns the ttl used for acquire and refresh.
    #[must_use]
    pub fn ttl_seconds(&self) -> u32 {
        self.ttl_seconds
    }

    /// Returns the cached owner token, if the handle acquired the lock.
    #[must_use]
    pub fn owner_token(&self) -> Option<&OwnerToken> {
        self.owner_token.as_ref()
    }

    /// Acquires the lock and caches its owner token.
    ///
    /// A token cached from an earlier acquisition is replaced without being
    /// released. That lock stays in the store until it expires.
    pub async fn acquire(&mut self) -> LockResult<AcquiredLock> {
        let lock = self
            .backend
            .acquire(self.key.as_str(), self.ttl_seconds)
            .await?;

        if let Some(previous) = self.owner_token.replace(lock.owner_token().clone()) {
            warn!(
                lock_key = %self.key,
                previous_owner_token = %previous,
                "replaced cached owner token without releasing it"
            );
        }

        info!(lock_key = %self.key, "acquired lock");
        Ok(lock)
    }

    /// Releases the cached token and clears it.
    ///
    /// Returns false when nothing is cached or the backend declined.
    pub async fn release(&mut self) -> bool {
        let Some(owner_token) = self.owner_token.take() else {
            warn!(lock_key = %self.key, "release called without a held lock");
            return false;
        };

        let released = self
            .backend
            .release(self.key.as_str(), owner_token.as_str())
            .await;
        if released {
            info!(lock_key = %self.key, "released lock");
        }

        released
    }

    /// Extends the held lock by the handle's ttl.
    pub async fn refresh(&mut self) -> LockResult<AcquiredLock> {
        let Some(owner_token) = self.owner_token.as_ref() else {
            return Err(LockError::RefreshLock(format!(
                "no lock held for key {}",
                self.key
            )));
        };

        let lock = self
            .backend
            .refresh(self.key.as_str(), owner_token.as_str(), self.ttl_seconds)
            .await?;
        self.owner_token = Some(lock.owner_token().clone());

        info!(
            lock_key = %self.key,
            expires_at = %lock.expires_at(),
            "refreshed lock"
        );
        Ok(lock)
    }

    /// Returns whether any live lock exists for the key.
    ///
    /// Reclaims an expired record as a side effect, like the backend call.
    pub async fn is_locked(&self) -> LockResult<bool> {
        self.backend.is_locked(self.key.as_str()).await
    }

    /// Runs `work` while holding the lock.
    ///
    /// The lock is released after `work` completes, whatever it returns. If
    /// the returned future is dropped or `work` panics before completion, the
    /// release is spawned on the current Tokio runtime instead; the cached
    /// token is then left stale on this handle.
    pub async fn run<F, Fut, T>(&mut self, work: F) -> LockResult<T>
    where
        F: FnOnce(AcquiredLock) -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.acquire().await?;
        let pending = PendingRelease::new(Arc::clone(&self.backend), &lock);

        let output = work(lock).await;

        pending.disarm();
        self.release().await;
        Ok(output)
    }
}

/// Spawns a release when dropped while still armed.
struct PendingRelease {
    backend: Arc<dyn LockBackend>,
    key: LockKey,
    owner_token: OwnerToken,
    armed: bool,
}

impl PendingRelease {
    fn new(backend: Arc<dyn LockBackend>, lock: &AcquiredLock) -> Self {
        Self {
            backend,
            key: lock.key().clone(),
            owner_token: lock.owner_token().clone(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingRelease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                lock_key = %self.key,
                "no runtime to release abandoned lock; it will expire"
            );
            return;
        };

        let backend = Arc::clone(&self.backend);
        let key = self.key.clone();
        let owner_token = self.owner_token.clone();
        runtime.spawn(async move {
            if backend.release(key.as_str(), owner_token.as_str()).await {
                info!(lock_key = %key, "released abandoned lock");
            }
        });
    }
}

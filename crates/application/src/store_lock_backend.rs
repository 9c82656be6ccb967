//! Lock protocol expressed over the [`LockStore`] port.
//!
//! Each operation is one conditional store round trip, except `is_locked`,
//! which may follow a read of an expired record with a reclaiming delete.
//! No retries happen here; a store client's own retry layer is the place for
//! that.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keylatch_core::{LockError, LockKey, LockResult, OwnerToken};
use keylatch_domain::{AcquiredLock, LockRecord, expiry_after, truncate_timestamp};
use tracing::{debug, error, info, warn};

use crate::lock_ports::{Clock, LockBackend, LockStore, SystemClock};

/// Lock backend implementing the protocol on any [`LockStore`].
#[derive(Clone)]
pub struct StoreLockBackend {
    store: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
}

impl StoreLockBackend {
    /// Creates a backend stamping expiries with the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a backend with an explicit clock.
    #[must_use]
    pub fn with_clock(store: Arc<dyn LockStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn now(&self) -> DateTime<Utc> {
        truncate_timestamp(self.clock.now())
    }
}

fn validate_ttl(ttl_seconds: u32) -> LockResult<()> {
    if ttl_seconds == 0 {
        return Err(LockError::Validation(
            "lock ttl_seconds must be greater than zero".to_owned(),
        ));
    }

    Ok(())
}

#[async_trait]
impl LockBackend for StoreLockBackend {
    async fn acquire(&self, key: &str, ttl_seconds: u32) -> LockResult<AcquiredLock> {
        let key = LockKey::new(key)?;
        validate_ttl(ttl_seconds)?;

        let now = self.now();
        let record = LockRecord::new(key, OwnerToken::generate(), now, ttl_seconds);

        let written = self
            .store
            .put_if_absent_or_expired(&record, now)
            .await
            .inspect_err(|error| {
                error!(lock_key = %record.key, error = %error, "failed to acquire lock");
            })?;

        if !written {
            warn!(lock_key = %record.key, "lock already held");
            return Err(LockError::DuplicateLock(format!(
                "key {} already locked",
                record.key
            )));
        }

        debug!(
            lock_key = %record.key,
            expires_at = %record.expires_at,
            "lock record written"
        );
        Ok(AcquiredLock::from(record))
    }

    async fn release(&self, key: &str, owner_token: &str) -> bool {
        let (key, owner_token) = match (LockKey::new(key), OwnerToken::new(owner_token)) {
            (Ok(key), Ok(owner_token)) => (key, owner_token),
            (Err(error), _) | (_, Err(error)) => {
                warn!(error = %error, "rejected lock release");
                return false;
            }
        };

        match self.store.delete_if_owner(&key, &owner_token).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    lock_key = %key,
                    "lock not released: absent or held by another owner"
                );
                false
            }
            Err(error) => {
                error!(lock_key = %key, error = %error, "failed to release lock");
                false
            }
        }
    }

    async fn refresh(
        &self,
        key: &str,
        owner_token: &str,
        ttl_seconds: u32,
    ) -> LockResult<AcquiredLock> {
        let key = LockKey::new(key)?;
        let owner_token = OwnerToken::new(owner_token)?;
        validate_ttl(ttl_seconds)?;

        let expires_at = expiry_after(self.now(), ttl_seconds);

        match self
            .store
            .update_expiry_if_owner(&key, &owner_token, expires_at)
            .await
        {
            Ok(true) => Ok(AcquiredLock::new(key, owner_token, expires_at)),
            Ok(false) => {
                warn!(lock_key = %key, "lock refresh rejected by store");
                Err(LockError::RefreshLock(format!(
                    "lock for key {key} is not held by this owner"
                )))
            }
            Err(error) => {
                error!(lock_key = %key, error = %error, "failed to refresh lock");
                Err(LockError::RefreshLock(format!(
                    "failed to refresh lock for key {key}: {error}"
                )))
            }
        }
    }

    async fn is_locked(&self, key: &str) -> LockResult<bool> {
        let key = LockKey::new(key)?;

        let Some(record) = self.store.get(&key).await? else {
            return Ok(false);
        };

        if !record.is_expired_at(self.now()) {
            return Ok(true);
        }

        // Unconditional delete: the record was observed expired.
        match self.store.delete(&key).await {
            Ok(()) => info!(lock_key = %key, "reclaimed expired lock"),
            Err(error) => warn!(
                lock_key = %key,
                error = %error,
                "failed to reclaim expired lock"
            ),
        }

        Ok(false)
    }
}

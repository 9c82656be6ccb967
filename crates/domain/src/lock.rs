use chrono::{DateTime, Utc};
use keylatch_core::{LockKey, OwnerToken};
use serde::{Deserialize, Serialize};

use crate::timestamp::{self, rfc3339_micros};

/// Lock record as persisted by a lock store, one per lock key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Protected resource identifier and store-level primary key.
    pub key: LockKey,
    /// Token of the current holder.
    pub owner_token: OwnerToken,
    /// Instant after which any caller may reclaim the record.
    #[serde(with = "rfc3339_micros")]
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    /// Creates a record expiring `ttl_seconds` after `now`.
    #[must_use]
    pub fn new(key: LockKey, owner_token: OwnerToken, now: DateTime<Utc>, ttl_seconds: u32) -> Self {
        Self {
            key,
            owner_token,
            expires_at: timestamp::expiry_after(now, ttl_seconds),
        }
    }

    /// Returns whether the record expired strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Snapshot of a successful acquisition or refresh.
///
/// Carries the owner token for later conditional requests. The store stays
/// the only authority on who currently holds the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredLock {
    key: LockKey,
    owner_token: OwnerToken,
    #[serde(with = "rfc3339_micros")]
    expires_at: DateTime<Utc>,
}

impl AcquiredLock {
    /// Creates an acquired lock snapshot.
    #[must_use]
    pub fn new(key: LockKey, owner_token: OwnerToken, expires_at: DateTime<Utc>) -> Self {
        Self {
            key,
            owner_token,
            expires_at,
        }
    }

    /// Returns the locked key.
    #[must_use]
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Returns the owner token proving this acquisition.
    #[must_use]
    pub fn owner_token(&self) -> &OwnerToken {
        &self.owner_token
    }

    /// Returns the expiry recorded at acquisition or last refresh.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl From<LockRecord> for AcquiredLock {
    fn from(record: LockRecord) -> Self {
        Self::new(record.key, record.owner_token, record.expires_at)
    }
}

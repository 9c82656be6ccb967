use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keylatch_application::LockStore;
use keylatch_core::{LockKey, LockResult, OwnerToken};
use keylatch_domain::LockRecord;
use tokio::sync::RwLock;

/// In-memory lock store for tests and single-process use.
///
/// Each operation runs under one guard of the map lock, which gives the same
/// per-key atomicity a remote store provides.
#[derive(Debug, Default)]
pub struct InMemoryLockStore {
    records: RwLock<HashMap<LockKey, LockRecord>>,
}

impl InMemoryLockStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record unconditionally, replacing any existing one.
    #[cfg(test)]
    pub(crate) async fn put(&self, record: LockRecord) {
        self.records.write().await.insert(record.key.clone(), record);
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn put_if_absent_or_expired(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> LockResult<bool> {
        let mut records = self.records.write().await;
        if records
            .get(&record.key)
            .is_some_and(|existing| !existing.is_expired_at(now))
        {
            return Ok(false);
        }

        records.insert(record.key.clone(), record.clone());
        Ok(true)
    }

    async fn delete_if_owner(&self, key: &LockKey, owner_token: &OwnerToken) -> LockResult<bool> {
        let mut records = self.records.write().await;
        if !records
            .get(key)
            .is_some_and(|existing| &existing.owner_token == owner_token)
        {
            return Ok(false);
        }

        records.remove(key);
        Ok(true)
    }

    async fn update_expiry_if_owner(
        &self,
        key: &LockKey,
        owner_token: &OwnerToken,
        expires_at: DateTime<Utc>,
    ) -> LockResult<bool> {
        let mut records = self.records.write().await;
        let Some(existing) = records
            .get_mut(key)
            .filter(|existing| &existing.owner_token == owner_token)
        else {
            return Ok(false);
        };

        existing.expires_at = expires_at;
        Ok(true)
    }

    async fn get(&self, key: &LockKey) -> LockResult<Option<LockRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &LockKey) -> LockResult<()> {
        self.records.write().await.remove(key);
        Ok(())
    }
}

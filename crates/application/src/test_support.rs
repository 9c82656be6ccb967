//! Fakes shared by application tests.

use std::collections::HashMap;
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use keylatch_core::{LockError, LockKey, LockResult, OwnerToken};
use keylatch_domain::LockRecord;
use tokio::sync::Mutex;

use crate::lock_ports::{Clock, LockStore};

/// Clock pinned to an instant that tests move explicitly.
pub(crate) struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 10, 18, 8, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        Self {
            now: StdMutex::new(start),
        }
    }

    pub(crate) fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map-backed store recording which operations were issued.
#[derive(Default)]
pub(crate) struct FakeLockStore {
    records: Mutex<HashMap<String, LockRecord>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeLockStore {
    pub(crate) async fn insert(&self, record: LockRecord) {
        self.records
            .lock()
            .await
            .insert(record.key.as_str().to_owned(), record);
    }

    pub(crate) async fn record(&self, key: &str) -> Option<LockRecord> {
        self.records.lock().await.get(key).cloned()
    }

    pub(crate) async fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().await.clone()
    }

    async fn track(&self, call: &'static str) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl LockStore for FakeLockStore {
    async fn put_if_absent_or_expired(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> LockResult<bool> {
        self.track("put_if_absent_or_expired").await;
        let mut records = self.records.lock().await;
        if records
            .get(record.key.as_str())
            .is_some_and(|existing| !existing.is_expired_at(now))
        {
            return Ok(false);
        }

        records.insert(record.key.as_str().to_owned(), record.clone());
        Ok(true)
    }

    async fn delete_if_owner(&self, key: &LockKey, owner_token: &OwnerToken) -> LockResult<bool> {
        self.track("delete_if_owner").await;
        let mut records = self.records.lock().await;
        if records
            .get(key.as_str())
            .is_some_and(|existing| &existing.owner_token == owner_token)
        {
            records.remove(key.as_str());
            return Ok(true);
        }

        Ok(false)
    }

    async fn update_expiry_if_owner(
        &self,
        key: &LockKey,
        owner_token: &OwnerToken,
        expires_at: DateTime<Utc>,
    ) -> LockResult<bool> {
        self.track("update_expiry_if_owner").await;
        let mut records = self.records.lock().await;
        match records.get_mut(key.as_str()) {
            Some(existing) if &existing.owner_token == owner_token => {
                existing.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, key: &LockKey) -> LockResult<Option<LockRecord>> {
        self.track("get").await;
        Ok(self.records.lock().await.get(key.as_str()).cloned())
    }

    async fn delete(&self, key: &LockKey) -> LockResult<()> {
        self.track("delete").await;
        self.records.lock().await.remove(key.as_str());
        Ok(())
    }
}

/// Store whose every call fails as if the network were down.
pub(crate) struct UnreachableLockStore;

fn unreachable_store() -> LockError {
    LockError::Store("connection refused".to_owned())
}

#[async_trait]
impl LockStore for UnreachableLockStore {
    async fn put_if_absent_or_expired(
        &self,
        _record: &LockRecord,
        _now: DateTime<Utc>,
    ) -> LockResult<bool> {
        Err(unreachable_store())
    }

    async fn delete_if_owner(
        &self,
        _key: &LockKey,
        _owner_token: &OwnerToken,
    ) -> LockResult<bool> {
        Err(unreachable_store())
    }

    async fn update_expiry_if_owner(
        &self,
        _key: &LockKey,
        _owner_token: &OwnerToken,
        _expires_at: DateTime<Utc>,
    ) -> LockResult<bool> {
        Err(unreachable_store())
    }

    async fn get(&self, _key: &LockKey) -> LockResult<Option<LockRecord>> {
        Err(unreachable_store())
    }

    async fn delete(&self, _key: &LockKey) -> LockResult<()> {
        Err(unreachable_store())
    }
}

/// Store holding one record that can be read but never deleted.
pub(crate) struct UndeletableLockStore {
    pub(crate) record: LockRecord,
}

#[async_trait]
impl LockStore for UndeletableLockStore {
    async fn put_if_absent_or_expired(
        &self,
        _record: &LockRecord,
        _now: DateTime<Utc>,
    ) -> LockResult<bool> {
        Ok(false)
    }

    async fn delete_if_owner(
        &self,
        _key: &LockKey,
        _owner_token: &OwnerToken,
    ) -> LockResult<bool> {
        Err(unreachable_store())
    }

    async fn update_expiry_if_owner(
        &self,
        _key: &LockKey,
        _owner_token: &OwnerToken,
        _expires_at: DateTime<Utc>,
    ) -> LockResult<bool> {
        Ok(false)
    }

    async fn get(&self, key: &LockKey) -> LockResult<Option<LockRecord>> {
        Ok((&self.record.key == key).then(|| self.record.clone()))
    }

    async fn delete(&self, _key: &LockKey) -> LockResult<()> {
        Err(unreachable_store())
    }
}

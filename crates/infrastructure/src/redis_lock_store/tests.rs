use std::sync::Arc;

use chrono::{Duration, Utc};
use keylatch_application::{LockBackend, LockStore, StoreLockBackend};
use keylatch_core::{LockError, LockKey, OwnerToken};
use keylatch_domain::{LockRecord, truncate_timestamp};

use super::RedisLockStore;

fn test_store() -> Option<RedisLockStore> {
    let Ok(redis_url) = std::env::var("REDIS_URL") else {
        return None;
    };

    let client = match redis::Client::open(redis_url.as_str()) {
        Ok(client) => client,
        Err(error) => panic!("failed to open REDIS_URL in test: {error}"),
    };

    let prefix = format!("keylatch-test:{}", OwnerToken::generate());
    match RedisLockStore::with_key_attribute(client, prefix, "resource_id") {
        Ok(store) => Some(store),
        Err(error) => panic!("failed to build redis lock store: {error}"),
    }
}

fn key(value: &str) -> LockKey {
    LockKey::new(value).unwrap_or_else(|_| unreachable!())
}

#[test]
fn key_attribute_is_validated() {
    let client = redis::Client::open("redis://127.0.0.1:6379").unwrap_or_else(|_| unreachable!());

    assert!(matches!(
        RedisLockStore::with_key_attribute(client, "locks", "owner_token"),
        Err(LockError::Validation(_))
    ));
}

#[tokio::test]
async fn conditional_operations_follow_ownership() {
    let Some(store) = test_store() else {
        return;
    };

    let now = truncate_timestamp(Utc::now());
    let record = LockRecord {
        key: key("res1"),
        owner_token: OwnerToken::generate(),
        expires_at: now + Duration::seconds(60),
    };
    let intruder = OwnerToken::generate();

    assert_eq!(store.put_if_absent_or_expired(&record, now).await, Ok(true));
    assert_eq!(store.put_if_absent_or_expired(&record, now).await, Ok(false));
    assert_eq!(store.get(&key("res1")).await, Ok(Some(record.clone())));

    let later = now + Duration::seconds(300);
    assert_eq!(
        store
            .update_expiry_if_owner(&record.key, &intruder, later)
            .await,
        Ok(false)
    );
    assert_eq!(
        store
            .update_expiry_if_owner(&record.key, &record.owner_token, later)
            .await,
        Ok(true)
    );
    assert_eq!(
        store
            .get(&record.key)
            .await
            .ok()
            .flatten()
            .map(|stored| stored.expires_at),
        Some(later)
    );

    assert_eq!(store.delete_if_owner(&record.key, &intruder).await, Ok(false));
    assert_eq!(
        store.delete_if_owner(&record.key, &record.owner_token).await,
        Ok(true)
    );
    assert_eq!(store.get(&record.key).await, Ok(None));
    assert_eq!(store.delete(&record.key).await, Ok(()));
}

#[tokio::test]
async fn expired_hash_is_overwritten_and_reclaimed() {
    let Some(store) = test_store() else {
        return;
    };

    let now = truncate_timestamp(Utc::now());
    let stale = LockRecord {
        key: key("res2"),
        owner_token: OwnerToken::generate(),
        expires_at: now - Duration::seconds(10),
    };
    assert_eq!(
        store
            .put_if_absent_or_expired(&stale, now - Duration::seconds(70))
            .await,
        Ok(true)
    );

    let store = Arc::new(store);
    let backend = StoreLockBackend::new(store.clone());
    assert_eq!(backend.is_locked("res2").await, Ok(false));
    assert_eq!(store.get(&stale.key).await, Ok(None));

    let lock = backend.acquire("res2", 30).await;
    assert!(lock.is_ok());
    assert!(backend
        .release("res2", lock.unwrap_or_else(|_| unreachable!()).owner_token().as_str())
        .await);
}

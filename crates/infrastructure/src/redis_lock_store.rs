//! Redis-backed lock store.
//!
//! Each lock lives in one hash at `{prefix}:{lock key}` holding the key
//! attribute, `owner_token` and `expires_at`. Conditional operations run as
//! Lua scripts so the check and the write are one atomic server-side step.
//! Timestamps are fixed-width strings, so the scripts compare them as text.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keylatch_application::LockStore;
use keylatch_core::{LockError, LockKey, LockResult, OwnerToken};
use keylatch_domain::{LockRecord, format_timestamp, parse_timestamp};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};

use crate::lock_attributes::{
    DEFAULT_KEY_ATTRIBUTE, EXPIRES_AT_ATTRIBUTE, OWNER_TOKEN_ATTRIBUTE, validate_key_attribute,
};

const PUT_IF_ABSENT_OR_EXPIRED_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  local expires_at = redis.call('HGET', KEYS[1], 'expires_at')
  if not expires_at or expires_at >= ARGV[4] then
    return 0
  end
  redis.call('DEL', KEYS[1])
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2], 'owner_token', ARGV[3], 'expires_at', ARGV[5])
return 1
"#;

const DELETE_IF_OWNER_SCRIPT: &str = r#"
if redis.call('HGET', KEYS[1], 'owner_token') == ARGV[1] then
  return redis.call('DEL', KEYS[1])
else
  return 0
end
"#;

const UPDATE_EXPIRY_IF_OWNER_SCRIPT: &str = r#"
if redis.call('HGET', KEYS[1], 'owner_token') == ARGV[1] then
  redis.call('HSET', KEYS[1], 'expires_at', ARGV[2])
  return 1
else
  return 0
end
"#;

/// Redis implementation of the lock store port.
#[derive(Clone)]
pub struct RedisLockStore {
    client: redis::Client,
    key_prefix: String,
    key_attribute: String,
}

impl RedisLockStore {
    /// Creates a store using the default `lock_key` attribute.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_owned(),
        }
    }

    /// Creates a store naming the key field of each hash `key_attribute`.
    pub fn with_key_attribute(
        client: redis::Client,
        key_prefix: impl Into<String>,
        key_attribute: &str,
    ) -> LockResult<Self> {
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            key_attribute: validate_key_attribute(key_attribute)?,
        })
    }

    fn key_for(&self, key: &LockKey) -> String {
        format!("{}:{}", self.key_prefix, key.as_str())
    }

    async fn connection(&self) -> LockResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| LockError::Store(format!("failed to connect to redis: {error}")))
    }

    fn record_from_fields(&self, mut fields: HashMap<String, String>) -> LockResult<LockRecord> {
        let mut take = |name: &str| {
            fields
                .remove(name)
                .ok_or_else(|| LockError::Store(format!("redis lock hash is missing '{name}'")))
        };

        let key = take(self.key_attribute.as_str())?;
        let owner_token = take(OWNER_TOKEN_ATTRIBUTE)?;
        let expires_at = take(EXPIRES_AT_ATTRIBUTE)?;

        Ok(LockRecord {
            key: LockKey::new(key).map_err(corrupt_record)?,
            owner_token: OwnerToken::new(owner_token).map_err(corrupt_record)?,
            expires_at: parse_timestamp(expires_at.as_str())?,
        })
    }
}

fn corrupt_record(error: LockError) -> LockError {
    LockError::Store(format!("malformed redis lock hash: {error}"))
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn put_if_absent_or_expired(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> LockResult<bool> {
        let mut connection = self.connection().await?;

        let written = Script::new(PUT_IF_ABSENT_OR_EXPIRED_SCRIPT)
            .key(self.key_for(&record.key))
            .arg(self.key_attribute.as_str())
            .arg(record.key.as_str())
            .arg(record.owner_token.as_str())
            .arg(format_timestamp(now))
            .arg(format_timestamp(record.expires_at))
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| LockError::Store(format!("failed to write redis lock: {error}")))?;

        Ok(written > 0)
    }

    async fn delete_if_owner(&self, key: &LockKey, owner_token: &OwnerToken) -> LockResult<bool> {
        let mut connection = self.connection().await?;

        let deleted = Script::new(DELETE_IF_OWNER_SCRIPT)
            .key(self.key_for(key))
            .arg(owner_token.as_str())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| LockError::Store(format!("failed to release redis lock: {error}")))?;

        Ok(deleted > 0)
    }

    async fn update_expiry_if_owner(
        &self,
        key: &LockKey,
        owner_token: &OwnerToken,
        expires_at: DateTime<Utc>,
    ) -> LockResult<bool> {
        let mut connection = self.connection().await?;

        let updated = Script::new(UPDATE_EXPIRY_IF_OWNER_SCRIPT)
            .key(self.key_for(key))
            .arg(owner_token.as_str())
            .arg(format_timestamp(expires_at))
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| LockError::Store(format!("failed to refresh redis lock: {error}")))?;

        Ok(updated > 0)
    }

    async fn get(&self, key: &LockKey) -> LockResult<Option<LockRecord>> {
        let mut connection = self.connection().await?;

        let fields: HashMap<String, String> = connection
            .hgetall(self.key_for(key))
            .await
            .map_err(|error| LockError::Store(format!("failed to read redis lock: {error}")))?;

        if fields.is_empty() {
            return Ok(None);
        }

        self.record_from_fields(fields).map(Some)
    }

    async fn delete(&self, key: &LockKey) -> LockResult<()> {
        let mut connection = self.connection().await?;

        connection
            .del::<_, ()>(self.key_for(key))
            .await
            .map_err(|error| LockError::Store(format!("failed to delete redis lock: {error}")))
    }
}

#[cfg(test)]
mod tests;

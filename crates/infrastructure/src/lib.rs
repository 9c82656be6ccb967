//! Lock store adapters for the application ports.

#![forbid(unsafe_code)]

mod in_memory_lock_store;
mod lock_attributes;
mod postgres_lock_store;
mod redis_lock_store;

pub use in_memory_lock_store::InMemoryLockStore;
pub use lock_attributes::DEFAULT_KEY_ATTRIBUTE;
pub use postgres_lock_store::{DEFAULT_LOCK_TABLE, PostgresLockStore};
pub use redis_lock_store::RedisLockStore;

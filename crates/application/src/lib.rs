//! Lock protocol, ports and lifecycle wrappers.

#![forbid(unsafe_code)]

mod lock_client;
mod lock_ports;
mod scoped_lock;
mod store_lock_backend;

#[cfg(test)]
mod test_support;

pub use lock_client::LockClient;
pub use lock_ports::{Clock, LockBackend, LockStore, SystemClock};
pub use scoped_lock::ScopedLock;
pub use store_lock_backend::StoreLockBackend;

//! Domain records and invariants for distributed locks.

#![forbid(unsafe_code)]

mod lock;
pub mod timestamp;

pub use lock::{AcquiredLock, LockRecord};
pub use timestamp::{expiry_after, format_timestamp, parse_timestamp, truncate_timestamp};

//! Shared primitives for all Rust crates in Keylatch.

#![forbid(unsafe_code)]

/// Ownership token primitives shared across lock backends.
pub mod token;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use token::OwnerToken;

/// Result type used across Keylatch crates.
pub type LockResult<T> = Result<T, LockError>;

/// Identifier of the resource protected by a distributed lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LockKey(String);

impl LockKey {
    /// Creates a validated lock key.
    pub fn new(value: impl Into<String>) -> LockResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(LockError::Validation(
                "lock key must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for LockKey {
    type Error = LockError;

    fn try_from(value: String) -> LockResult<Self> {
        Self::new(value)
    }
}

impl From<LockKey> for String {
    fn from(value: LockKey) -> Self {
        value.0
    }
}

impl Display for LockKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Lock error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Invalid input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Another holder owns a live lock on the key.
    #[error("duplicate lock: {0}")]
    DuplicateLock(String),

    /// The lock could not be refreshed and may no longer be held.
    #[error("refresh lock failed: {0}")]
    RefreshLock(String),

    /// The backing store failed or returned malformed data.
    #[error("store error: {0}")]
    Store(String),
}

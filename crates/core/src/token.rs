use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LockError, LockResult};

/// Opaque value proving ownership of a lock record.
///
/// Generated tokens are random 128-bit UUIDs rendered in hyphenated form.
/// Tokens received from other processes are accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerToken(String);

impl OwnerToken {
    /// Generates a fresh random owner token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing token value, rejecting empty input.
    pub fn new(value: impl Into<String>) -> LockResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(LockError::Validation(
                "owner token must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for OwnerToken {
    type Error = LockError;

    fn try_from(value: String) -> LockResult<Self> {
        Self::new(value)
    }
}

impl From<OwnerToken> for String {
    fn from(value: OwnerToken) -> Self {
        value.0
    }
}

impl Display for OwnerToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::OwnerToken;

    #[test]
    fn generated_tokens_are_distinct_uuids() {
        let first = OwnerToken::generate();
        let second = OwnerToken::generate();

        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 36);
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(OwnerToken::new("").is_err());
        assert!(OwnerToken::new("\t").is_err());
    }
}

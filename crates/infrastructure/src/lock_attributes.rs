use keylatch_core::{LockError, LockResult};

/// Default attribute holding the lock key in persisted records.
pub const DEFAULT_KEY_ATTRIBUTE: &str = "lock_key";

pub(crate) const OWNER_TOKEN_ATTRIBUTE: &str = "owner_token";
pub(crate) const EXPIRES_AT_ATTRIBUTE: &str = "expires_at";

/// Validates a table, column or field name interpolated into store commands.
///
/// Accepts lowercase ASCII identifiers: a letter or underscore followed by
/// letters, digits or underscores, at most 63 bytes.
pub(crate) fn validate_identifier(kind: &str, value: &str) -> LockResult<String> {
    let mut characters = value.chars();
    let starts_well = characters
        .next()
        .is_some_and(|first| first.is_ascii_lowercase() || first == '_');
    let rest_ok = characters.all(|character| {
        character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
    });

    if !starts_well || !rest_ok || value.len() > 63 {
        return Err(LockError::Validation(format!(
            "{kind} '{value}' must match [a-z_][a-z0-9_]* and be at most 63 bytes"
        )));
    }

    Ok(value.to_owned())
}

/// Validates the key attribute name and keeps it apart from the fixed fields.
pub(crate) fn validate_key_attribute(value: &str) -> LockResult<String> {
    let value = validate_identifier("lock key attribute", value)?;
    if value == OWNER_TOKEN_ATTRIBUTE || value == EXPIRES_AT_ATTRIBUTE {
        return Err(LockError::Validation(format!(
            "lock key attribute '{value}' collides with a reserved lock attribute"
        )));
    }

    Ok(value)
}

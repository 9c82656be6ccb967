//! Lock timestamp precision and persisted format.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use keylatch_core::{LockError, LockResult};

/// Number of fractional second digits kept on every lock timestamp.
pub const TIMESTAMP_PRECISION_DIGITS: u16 = 6;

/// Truncates a timestamp to the precision persisted by lock stores.
#[must_use]
pub fn truncate_timestamp(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(TIMESTAMP_PRECISION_DIGITS)
}

/// Returns the expiry for a lock taken at `now` with the given ttl.
#[must_use]
pub fn expiry_after(now: DateTime<Utc>, ttl_seconds: u32) -> DateTime<Utc> {
    truncate_timestamp(now) + Duration::seconds(i64::from(ttl_seconds))
}

/// Formats a timestamp as fixed-width RFC 3339 with microseconds and `Z`.
///
/// Equal-width output keeps string order identical to chronological order,
/// which stores comparing raw strings rely on.
#[must_use]
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    truncate_timestamp(value).to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses an RFC 3339 timestamp with any offset into UTC.
pub fn parse_timestamp(value: &str) -> LockResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| LockError::Store(format!("invalid lock timestamp '{value}': {error}")))
}

/// Serde adapter persisting timestamps through [`format_timestamp`].
pub mod rfc3339_micros {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes one timestamp.
    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(super::format_timestamp(*value).as_str())
    }

    /// Deserializes one timestamp.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(raw.as_str()).map_err(serde::de::Error::custom)
    }
}

use chrono::{DateTime, Utc};

/// Wall-clock source used to stamp and compare lock expiries.
///
/// Cooperating processes are assumed to agree on wall time within a small
/// tolerance. Skew shifts reclamation earlier or later by the skew amount.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

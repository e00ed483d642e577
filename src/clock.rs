//! Injectable clock for day bucketing and timestamps
//!
//! Queue numbers reset per calendar day, so the engine never reads the system
//! time directly; it goes through a [`Clock`] handle that tests can pin.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;

/// Time source for the queue engine
pub trait Clock: Send + Sync {
    /// Current timestamp
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day (UTC), used as the day-bucket key
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// System clock backed by `chrono::Utc::now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for tests and demos
///
/// Starts at a given instant and only moves when told to, so day boundaries
/// are deterministic.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a fixed clock pinned to the given instant
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Create a fixed clock at midnight UTC of the given date
    pub fn at_midnight(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(0, 0, 0).expect("valid midnight").and_utc())
    }

    /// Move the clock to a new instant
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }

    /// Advance the clock by a duration
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = *now + delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

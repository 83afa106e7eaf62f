//! Clock port
//!
//! Timestamps and timeout comparisons go through this trait so that hosts
//! (and tests) control how time advances. Implementations must be
//! monotonic: `now()` never returns an earlier instant than a previous call.

use chrono::{DateTime, Utc};

pub trait IClock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> DateTime<Utc>;
}

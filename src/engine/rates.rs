//! Rate window lookup.
//!
//! Resolves the rate valid at an instant from a tariff's rate windows.
//! Upstream windows for one tariff never overlap, so at most one record
//! covers any instant; if they did, the first in iteration order wins.

use chrono::{DateTime, Utc};

use crate::types::RateRecord;

/// The first rate whose validity window covers `at`, or `None` when no
/// window does. A gap in coverage is an expected outcome, not an error.
pub fn resolve(rates: &[RateRecord], at: DateTime<Utc>) -> Option<&RateRecord> {
    rates.iter().find(|rate| rate.covers(at))
}

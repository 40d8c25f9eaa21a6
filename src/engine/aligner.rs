//! Consumption aligner: merges gas and electricity series by interval.
//!
//! The output is seeded with one record per gas interval, in gas order.
//! Each electricity interval is then attached to the first record with an
//! identical `interval_start`, or appended as an electricity-only record.
//! Output order is therefore insertion order, not chronological order.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::{ConsumptionRecord, DualIntervalRecord};

/// Merge the two series into dual-commodity interval records.
///
/// Matching is exact timestamp equality. Lookups go through an index of the
/// first record per `interval_start`, which gives the same result as a
/// linear first-match scan over the accumulated output.
pub fn align(gas: &[ConsumptionRecord], electricity: &[ConsumptionRecord]) -> Vec<DualIntervalRecord> {
    let mut merged: Vec<DualIntervalRecord> = Vec::with_capacity(gas.len().max(electricity.len()));
    let mut index: HashMap<DateTime<Utc>, usize> = HashMap::with_capacity(merged.capacity());

    for record in gas {
        index.entry(record.interval_start).or_insert(merged.len());
        merged.push(DualIntervalRecord {
            interval_start: record.interval_start,
            interval_end: record.interval_end,
            gas: Some(record.quantity),
            electricity: None,
        });
    }

    for record in electricity {
        match index.get(&record.interval_start) {
            Some(&position) => merged[position].electricity = Some(record.quantity),
            None => {
                index.insert(record.interval_start, merged.len());
                merged.push(DualIntervalRecord {
                    interval_start: record.interval_start,
                    interval_end: record.interval_end,
                    gas: None,
                    electricity: Some(record.quantity),
                });
            }
        }
    }

    merged
}

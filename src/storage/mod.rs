//! Persistence layer.
//!
//! Converts costed intervals into tagged numeric points and hands them to a
//! `PointSink`. Two batches are written per cycle: `usage` (one point per
//! interval) and `costs` (one point per tariff per interval), both stamped
//! at `interval_start`.

pub mod influx;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::CostedInterval;

/// Measurement holding raw consumption.
pub const USAGE_MEASUREMENT: &str = "usage";

/// Measurement holding per-tariff costs.
pub const COSTS_MEASUREMENT: &str = "costs";

/// A single tagged point in the time-series store.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub measurement: &'static str,
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<(&'static str, String)>,
    pub fields: Vec<(&'static str, f64)>,
}

impl DataPoint {
    fn new(measurement: &'static str, timestamp: DateTime<Utc>) -> Self {
        Self { measurement, timestamp, tags: Vec::new(), fields: Vec::new() }
    }

    fn tag(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.tags.push((key, value.into()));
        self
    }

    fn field(mut self, key: &'static str, value: f64) -> Self {
        self.fields.push((key, value));
        self
    }

    /// Value of a field by name.
    pub fn field_value(&self, key: &str) -> Option<f64> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Value of a tag by name.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }
}

/// Abstraction over the time-series store.
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Persist one batch of points.
    async fn write_points(&self, points: Vec<DataPoint>) -> Result<()>;
}

/// One `usage` point per interval, with `gas` / `electricity` fields only
/// where a reading exists.
pub fn usage_points(results: &[CostedInterval]) -> Vec<DataPoint> {
    results
        .iter()
        .map(|costed| {
            let interval = &costed.interval;
            let mut point = DataPoint::new(USAGE_MEASUREMENT, interval.interval_start);
            if let Some(gas) = interval.gas {
                point = point.field("gas", gas);
            }
            if let Some(electricity) = interval.electricity {
                point = point.field("electricity", electricity);
            }
            point
        })
        .collect()
}

/// One `costs` point per cost entry, tagged with the tariff's commodity and
/// name.
pub fn cost_points(results: &[CostedInterval]) -> Vec<DataPoint> {
    results
        .iter()
        .flat_map(|costed| {
            costed.costs.iter().map(move |entry| {
                DataPoint::new(COSTS_MEASUREMENT, costed.interval.interval_start)
                    .field("standingCharge", entry.standing_charge.price)
                    .field("unitRate", entry.unit_rate.price)
                    .field("cost", entry.cost)
                    .tag("type", entry.tariff.commodity.as_str())
                    .tag("tariff", entry.tariff.name.clone())
            })
        })
        .collect()
}

/// Write the usage batch, then the costs batch. Empty batches are skipped.
pub async fn write_results(sink: &dyn PointSink, results: &[CostedInterval]) -> Result<()> {
    for batch in [usage_points(results), cost_points(results)] {
        if !batch.is_empty() {
            sink.write_points(batch).await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

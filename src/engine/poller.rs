//! Poll cycle orchestrator.
//!
//! One cycle: fetch tariff rates → fetch consumption → align → cost →
//! persist. Any failure aborts the cycle before anything is written.

use anyhow::Result;
use chrono::{DateTime, Months, Utc};
use futures::future::try_join_all;
use std::time::{Duration, Instant};
use tracing::info;

use super::aligner::align;
use super::costing::cost;
use crate::provider::octopus::OctopusClient;
use crate::storage::{self, PointSink};
use crate::types::{iso8601, Commodity, RateKind, Tariff, TariffData};

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a completed poll cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub from: DateTime<Utc>,
    pub gas_records: usize,
    pub electricity_records: usize,
    pub intervals: usize,
    pub cost_entries: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Start of the fetch window: `lookback_months` before `now`, but never
/// earlier than `hard_from`.
pub fn window_start(
    now: DateTime<Utc>,
    lookback_months: u32,
    hard_from: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let from = now
        .checked_sub_months(Months::new(lookback_months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    match hard_from {
        Some(hard_from) if from < hard_from => hard_from,
        _ => from,
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct Poller {
    octopus: OctopusClient,
    sink: Box<dyn PointSink>,
    tariffs: Vec<Tariff>,
}

impl Poller {
    pub fn new(octopus: OctopusClient, sink: Box<dyn PointSink>, tariffs: Vec<Tariff>) -> Self {
        Self { octopus, sink, tariffs }
    }

    /// Fetch both rate series of one tariff concurrently.
    async fn fetch_tariff_data(&self, tariff: &Tariff, from: &DateTime<Utc>) -> Result<TariffData> {
        let (standing_charges, unit_rates) = futures::try_join!(
            self.octopus.get_tariff_rates(tariff, RateKind::StandingCharge, from),
            self.octopus.get_tariff_rates(tariff, RateKind::UnitRate, from),
        )?;

        Ok(TariffData { tariff: tariff.clone(), standing_charges, unit_rates })
    }

    /// Run one complete cycle for the window starting at `from`.
    pub async fn poll(&self, from: DateTime<Utc>) -> Result<CycleReport> {
        let started = Instant::now();
        info!(from = %iso8601(&from), tariffs = self.tariffs.len(), "Poll started");

        // 1. Tariff rates, in tariff order
        let tariff_data = try_join_all(
            self.tariffs.iter().map(|tariff| self.fetch_tariff_data(tariff, &from)),
        )
        .await?;

        // 2. Consumption for both meters
        let (gas, electricity) = futures::try_join!(
            self.octopus.get_consumption(Commodity::Gas, &from),
            self.octopus.get_consumption(Commodity::Electricity, &from),
        )?;

        // 3–4. Align and cost
        let intervals = align(&gas, &electricity);
        let results = cost(&intervals, &tariff_data)?;

        // 5. Persist
        storage::write_results(self.sink.as_ref(), &results).await?;

        let report = CycleReport {
            from,
            gas_records: gas.len(),
            electricity_records: electricity.len(),
            intervals: results.len(),
            cost_entries: results.iter().map(|r| r.costs.len()).sum(),
            elapsed: started.elapsed(),
        };
        info!(
            intervals = report.intervals,
            cost_entries = report.cost_entries,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Poll finished"
        );
        Ok(report)
    }
}

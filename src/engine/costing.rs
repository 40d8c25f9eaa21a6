//! Cost engine.
//!
//! Prices every aligned interval under every tariff:
//!
//! ```text
//! cost = standing_charge / 48 + quantity × unit_rate
//! ```
//!
//! The standing charge is a daily fee spread evenly over the 48 half-hour
//! intervals of a day. The divisor is fixed and does not follow the actual
//! interval length. `quantity` is the tariff's own commodity, zero when the
//! interval has no reading for it.

use tracing::debug;

use super::rates::resolve;
use crate::types::{
    CostEntry, CostedInterval, DualIntervalRecord, PollerError, RateKind, RateRecord, TariffData,
};

/// Number of half-hour intervals per day the standing charge is spread over.
pub const HALF_HOURS_PER_DAY: f64 = 48.0;

/// Cost of one interval given its rates and the billed quantity.
pub fn interval_cost(standing_charge: &RateRecord, unit_rate: &RateRecord, quantity: f64) -> f64 {
    standing_charge.price / HALF_HOURS_PER_DAY + quantity * unit_rate.price
}

/// Price one interval under one tariff.
fn cost_entry(interval: &DualIntervalRecord, data: &TariffData) -> Result<CostEntry, PollerError> {
    let at = interval.interval_start;
    let lookup = |kind: RateKind| {
        resolve(data.rates(kind), at).ok_or_else(|| PollerError::RateNotFound {
            tariff: data.tariff.name.clone(),
            kind,
            at,
        })
    };

    let standing_charge = lookup(RateKind::StandingCharge)?;
    let unit_rate = lookup(RateKind::UnitRate)?;
    let quantity = interval.quantity(data.tariff.commodity).unwrap_or(0.0);

    Ok(CostEntry {
        tariff: data.tariff.clone(),
        standing_charge: standing_charge.clone(),
        unit_rate: unit_rate.clone(),
        cost: interval_cost(standing_charge, unit_rate, quantity),
    })
}

/// Price every interval under every tariff.
///
/// Each output interval carries exactly one entry per tariff, in tariff
/// order. The first missing rate fails the whole call; no partial result is
/// returned.
pub fn cost(intervals: &[DualIntervalRecord], tariffs: &[TariffData]) -> Result<Vec<CostedInterval>, PollerError> {
    let costed = intervals
        .iter()
        .map(|interval| {
            let costs = tariffs
                .iter()
                .map(|data| cost_entry(interval, data))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CostedInterval { interval: interval.clone(), costs })
        })
        .collect::<Result<Vec<_>, PollerError>>()?;

    debug!(intervals = costed.len(), tariffs = tariffs.len(), "Intervals costed");
    Ok(costed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Shared types for the meter cost poller.
//!
//! These types form the data model used across the provider, engine and
//! storage modules. Records are immutable once fetched; the engine builds
//! new values rather than mutating its inputs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Commodity
// ---------------------------------------------------------------------------

/// The metered commodity. Also the tariff `type` in the tariff file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commodity {
    Gas,
    Electricity,
}

impl Commodity {
    /// Lowercase name as used in provider URLs and storage tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Commodity::Gas => "gas",
            Commodity::Electricity => "electricity",
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Commodity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gas" => Ok(Commodity::Gas),
            "electricity" | "electric" => Ok(Commodity::Electricity),
            _ => Err(anyhow::anyhow!("Unknown commodity: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Consumption
// ---------------------------------------------------------------------------

/// Metered quantity for one commodity over one provider-defined interval
/// (typically 30 minutes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
    pub quantity: f64,
}

/// Gas and electricity quantities for the same interval, keyed by
/// `interval_start`. At least one of the two is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualIntervalRecord {
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
    pub gas: Option<f64>,
    pub electricity: Option<f64>,
}

impl DualIntervalRecord {
    /// The quantity billed by a tariff of the given commodity.
    pub fn quantity(&self, commodity: Commodity) -> Option<f64> {
        match commodity {
            Commodity::Gas => self.gas,
            Commodity::Electricity => self.electricity,
        }
    }
}

// ---------------------------------------------------------------------------
// Rates & tariffs
// ---------------------------------------------------------------------------

/// A price valid over `[valid_from, valid_to]`. `valid_to == None` means the
/// window is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    /// Major currency units per unit, tax included (e.g. £/kWh or £/day).
    pub price: f64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl RateRecord {
    /// Whether the validity window covers `at`. Both bounds are inclusive.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_to.map_or(true, |to| to >= at)
    }
}

/// The two rate series every tariff publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateKind {
    StandingCharge,
    UnitRate,
}

impl RateKind {
    /// Path segment of the provider's rates resource.
    pub fn path_segment(&self) -> &'static str {
        match self {
            RateKind::StandingCharge => "standing-charges",
            RateKind::UnitRate => "standard-unit-rates",
        }
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateKind::StandingCharge => write!(f, "standing charge"),
            RateKind::UnitRate => write!(f, "unit rate"),
        }
    }
}

/// A named pricing plan for one commodity.
///
/// Identity is `(product_code, tariff_code, commodity)`; `name` is only a
/// display label and the `tariff` tag in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tariff {
    #[serde(rename = "type")]
    pub commodity: Commodity,
    pub name: String,
    pub product_code: String,
    pub tariff_code: String,
}

impl PartialEq for Tariff {
    fn eq(&self, other: &Self) -> bool {
        self.product_code == other.product_code
            && self.tariff_code == other.tariff_code
            && self.commodity == other.commodity
    }
}

impl Eq for Tariff {}

impl fmt::Display for Tariff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {}/{})", self.name, self.commodity, self.product_code, self.tariff_code)
    }
}

/// A tariff together with the rates fetched for it in the current cycle.
#[derive(Debug, Clone)]
pub struct TariffData {
    pub tariff: Tariff,
    pub standing_charges: Vec<RateRecord>,
    pub unit_rates: Vec<RateRecord>,
}

impl TariffData {
    pub fn rates(&self, kind: RateKind) -> &[RateRecord] {
        match kind {
            RateKind::StandingCharge => &self.standing_charges,
            RateKind::UnitRate => &self.unit_rates,
        }
    }
}

// ---------------------------------------------------------------------------
// Costs
// ---------------------------------------------------------------------------

/// The cost of one interval under one tariff, with the rates that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEntry {
    pub tariff: Tariff,
    pub standing_charge: RateRecord,
    pub unit_rate: RateRecord,
    pub cost: f64,
}

/// An aligned interval with one cost entry per tariff, in tariff order.
#[derive(Debug, Clone, PartialEq)]
pub struct CostedInterval {
    pub interval: DualIntervalRecord,
    pub costs: Vec<CostEntry>,
}

/// Format an instant the way the provider expects in query strings:
/// UTC, millisecond precision, `Z` suffix.
pub fn iso8601(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific errors. Each one aborts the current poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("Badly formed paged result from {url}: `results` is not an array")]
    MalformedResponse { url: String },

    #[error("Unable to find {kind} for tariff {tariff} at time {}", iso8601(.at))]
    RateNotFound {
        tariff: String,
        kind: RateKind,
        at: DateTime<Utc>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

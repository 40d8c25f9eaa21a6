//! Octopus Energy REST API client.
//!
//! API: `https://api.octopus.energy/v1`
//! Auth: API key as basic-auth username, empty password.
//! Pagination: cursor-based (`next` URL), see `pager`.
//! Timestamps: ISO 8601 strings (e.g. "2024-01-01T00:30:00Z").
//! Prices: pence including VAT; converted to pounds on ingest.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::pager::PagedFetcher;
use super::JsonSource;
use crate::config::{MeterConfig, OctopusConfig};
use crate::types::{iso8601, Commodity, ConsumptionRecord, RateKind, RateRecord, Tariff};

/// Page size requested from the consumption endpoints.
const CONSUMPTION_PAGE_SIZE: u32 = 25_000;

/// Page size requested from the tariff rate endpoints.
const RATES_PAGE_SIZE: u32 = 10_000;

/// Upstream prices are minor currency units; stored prices are major units.
const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

// ---------------------------------------------------------------------------
// API response types (Octopus JSON → Rust)
// ---------------------------------------------------------------------------

/// One entry of `…/consumption` results.
#[derive(Debug, Deserialize)]
struct RawConsumption {
    consumption: f64,
    interval_start: DateTime<Utc>,
    interval_end: DateTime<Utc>,
}

impl From<RawConsumption> for ConsumptionRecord {
    fn from(raw: RawConsumption) -> Self {
        Self {
            interval_start: raw.interval_start,
            interval_end: raw.interval_end,
            quantity: raw.consumption,
        }
    }
}

/// One entry of `…/standing-charges` or `…/standard-unit-rates` results.
#[derive(Debug, Deserialize)]
struct RawRate {
    value_inc_vat: f64,
    valid_from: DateTime<Utc>,
    #[serde(default)]
    valid_to: Option<DateTime<Utc>>,
}

impl From<RawRate> for RateRecord {
    fn from(raw: RawRate) -> Self {
        Self {
            price: raw.value_inc_vat / MINOR_UNITS_PER_MAJOR,
            valid_from: raw.valid_from,
            valid_to: raw.valid_to,
        }
    }
}

fn decode_consumption(raw: Value) -> Result<ConsumptionRecord> {
    Ok(serde_json::from_value::<RawConsumption>(raw)?.into())
}

fn decode_rate(raw: Value) -> Result<RateRecord> {
    Ok(serde_json::from_value::<RawRate>(raw)?.into())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Octopus Energy client for one household (one gas and one electricity meter).
pub struct OctopusClient {
    source: Box<dyn JsonSource>,
    base_url: String,
    electricity: MeterConfig,
    gas: MeterConfig,
}

impl OctopusClient {
    /// Create a client over any transport. Production code passes a
    /// `BasicAuthSource`; tests pass an in-memory source.
    pub fn new(config: &OctopusConfig, source: Box<dyn JsonSource>) -> Self {
        Self {
            source,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            electricity: config.electricity.clone(),
            gas: config.gas.clone(),
        }
    }

    fn meter(&self, commodity: Commodity) -> &MeterConfig {
        match commodity {
            Commodity::Gas => &self.gas,
            Commodity::Electricity => &self.electricity,
        }
    }

    /// `{base}/{type}-meter-points/{mpan}/meters/{serial}/consumption?period_from=…&page_size=25000`
    pub fn consumption_url(&self, commodity: Commodity, from: &DateTime<Utc>) -> String {
        let meter = self.meter(commodity);
        format!(
            "{}/{}-meter-points/{}/meters/{}/consumption?period_from={}&page_size={CONSUMPTION_PAGE_SIZE}",
            self.base_url,
            commodity,
            urlencoding::encode(&meter.mpan),
            urlencoding::encode(&meter.serial),
            iso8601(from),
        )
    }

    /// `{base}/products/{product}/{type}-tariffs/{tariff}/{kind}?period_from=…&page_size=10000`
    pub fn rates_url(&self, tariff: &Tariff, kind: RateKind, from: &DateTime<Utc>) -> String {
        format!(
            "{}/products/{}/{}-tariffs/{}/{}?period_from={}&page_size={RATES_PAGE_SIZE}",
            self.base_url,
            urlencoding::encode(&tariff.product_code),
            tariff.commodity,
            urlencoding::encode(&tariff.tariff_code),
            kind.path_segment(),
            iso8601(from),
        )
    }

    /// All consumption intervals for one meter since `from`.
    pub async fn get_consumption(
        &self,
        commodity: Commodity,
        from: &DateTime<Utc>,
    ) -> Result<Vec<ConsumptionRecord>> {
        let url = self.consumption_url(commodity, from);
        let records = PagedFetcher::new(self.source.as_ref())
            .fetch_all(&url, decode_consumption)
            .await?;

        info!(%commodity, count = records.len(), "Consumption fetched");
        Ok(records)
    }

    /// All rate windows of one kind for a tariff since `from`, priced in
    /// major currency units.
    pub async fn get_tariff_rates(
        &self,
        tariff: &Tariff,
        kind: RateKind,
        from: &DateTime<Utc>,
    ) -> Result<Vec<RateRecord>> {
        let url = self.rates_url(tariff, kind, from);
        let rates = PagedFetcher::new(self.source.as_ref())
            .fetch_all(&url, decode_rate)
            .await?;

        info!(tariff = %tariff.name, %kind, count = rates.len(), "Tariff rates fetched");
        Ok(rates)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

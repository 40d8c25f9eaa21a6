//! meter-costs entry point.
//!
//! Loads configuration and the tariff list, initialises structured logging,
//! builds the provider client and InfluxDB sink, and runs the
//! poll → align → cost → persist loop with graceful shutdown.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use secrecy::SecretString;
use std::time::Duration;
use tracing::{error, info};

use meter_costs::config::{self, AppConfig};
use meter_costs::engine::poller::{window_start, CycleReport, Poller};
use meter_costs::provider::http::BasicAuthSource;
use meter_costs::provider::octopus::OctopusClient;
use meter_costs::storage::influx::InfluxWriter;
use meter_costs::types::iso8601;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "METER_COSTS_CONFIG", default_value = "config.toml")]
    config: String,

    /// JSON tariff file. Overrides `poller.tariff_file`.
    #[arg(short = 't', long = "tariff-file", env = "TARIFF_FILE")]
    tariff_file: Option<String>,

    /// Never poll from before this instant (RFC 3339). Overrides
    /// `poller.hard_from_date`.
    #[arg(long = "hard-from-date", env = "HARD_FROM_DATE")]
    hard_from_date: Option<DateTime<Utc>>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args = Args::parse();
    let cfg = AppConfig::load(&args.config)?;

    init_logging();

    let tariff_file = args.tariff_file.as_deref().unwrap_or(&cfg.poller.tariff_file);
    let tariffs = config::load_tariffs(tariff_file)?;
    let hard_from = args.hard_from_date.or(cfg.poller.hard_from_date);

    info!(
        tariffs = %tariffs.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", "),
        tariff_file,
        "Found tariffs"
    );
    info!(
        base_url = %cfg.octopus.base_url,
        influx = %cfg.influx.url,
        bucket = %cfg.influx.bucket,
        interval_secs = cfg.poller.interval_secs,
        lookback_months = cfg.poller.lookback_months,
        hard_from = ?hard_from.as_ref().map(iso8601),
        "meter-costs starting up"
    );

    // -- Initialise components -------------------------------------------

    let api_key = SecretString::new(AppConfig::resolve_env(&cfg.octopus.api_key_env)?);
    let source = BasicAuthSource::new(api_key, cfg.octopus.request_timeout())?;
    let octopus = OctopusClient::new(&cfg.octopus, Box::new(source));

    let token = AppConfig::resolve_env(&cfg.influx.token_env)
        .context("InfluxDB token is required")?;
    let sink = InfluxWriter::new(&cfg.influx, token);

    let poller = Poller::new(octopus, Box::new(sink), tariffs);

    // -- Main loop -------------------------------------------------------

    let pause = Duration::from_secs(cfg.poller.interval_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let from = window_start(Utc::now(), cfg.poller.lookback_months, hard_from);

        // A cycle always runs to completion; shutdown is honoured between cycles.
        match poller.poll(from).await {
            Ok(report) => log_cycle_report(&report),
            Err(e) => error!(error = format!("{e:#}"), "Poll failed, retrying next cycle"),
        }

        if args.once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("meter-costs shut down cleanly.");
    Ok(())
}

/// Log a human-readable cycle summary.
fn log_cycle_report(report: &CycleReport) {
    info!(
        from = %iso8601(&report.from),
        gas = report.gas_records,
        electricity = report.electricity_records,
        intervals = report.intervals,
        cost_entries = report.cost_entries,
        elapsed = ?report.elapsed,
        "Cycle complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("meter_costs=info"));

    if std::env::var("METER_COSTS_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

//! End-to-end poll cycles: fetch → align → cost → persist.

use approx::assert_abs_diff_eq;
use chrono::Duration;

use meter_costs::engine::poller::Poller;
use meter_costs::provider::octopus::OctopusClient;
use meter_costs::types::{Commodity, PollerError, RateKind, Tariff};

use crate::mock_provider::*;

fn agile() -> Tariff {
    Tariff {
        commodity: Commodity::Electricity,
        name: "Agile".into(),
        product_code: "AGILE-18-02-21".into(),
        tariff_code: "E-1R-AGILE-18-02-21-C".into(),
    }
}

fn tracker() -> Tariff {
    Tariff {
        commodity: Commodity::Gas,
        name: "Tracker".into(),
        product_code: "SILVER-FLEX-22-11-25".into(),
        tariff_code: "G-1R-SILVER-FLEX-22-11-25-C".into(),
    }
}

/// Builds URLs exactly as the poller's client will request them.
fn urls() -> OctopusClient {
    OctopusClient::new(&octopus_config(), Box::new(MockOctopus::new()))
}

/// Route both rate series of a tariff with full coverage of the window.
fn route_full_rates(mock: &MockOctopus, tariff: &Tariff, standing_pence: f64, unit_pence: f64) {
    let urls = urls();
    let since = window() - Duration::days(30);
    mock.paged(
        &urls.rates_url(tariff, RateKind::StandingCharge, &window()),
        vec![vec![rate(standing_pence, since, None)]],
    );
    mock.paged(
        &urls.rates_url(tariff, RateKind::UnitRate, &window()),
        vec![vec![rate(unit_pence, since, None)]],
    );
}

/// Two gas records (slots 0, 1) and two electricity records (slots 1, 2).
fn route_consumption(mock: &MockOctopus) {
    let urls = urls();
    mock.paged(
        &urls.consumption_url(Commodity::Gas, &window()),
        vec![vec![consumption(0, 1.0), consumption(1, 2.0)]],
    );
    mock.paged(
        &urls.consumption_url(Commodity::Electricity, &window()),
        vec![vec![consumption(1, 0.5), consumption(2, 0.7)]],
    );
}

fn poller(mock: &MockOctopus, sink: &MemorySink, tariffs: Vec<Tariff>) -> Poller {
    let client = OctopusClient::new(&octopus_config(), Box::new(mock.clone()));
    Poller::new(client, Box::new(sink.clone()), tariffs)
}

#[tokio::test]
async fn test_end_to_end_three_intervals_one_tariff() {
    let mock = MockOctopus::new();
    let sink = MemorySink::default();
    route_full_rates(&mock, &agile(), 48.0, 20.0);
    route_consumption(&mock);

    let report = poller(&mock, &sink, vec![agile()]).poll(window()).await.unwrap();

    assert_eq!(report.gas_records, 2);
    assert_eq!(report.electricity_records, 2);
    assert_eq!(report.intervals, 3);
    assert_eq!(report.cost_entries, 3);

    let batches = sink.batches();
    assert_eq!(batches.len(), 2);

    let usage = &batches[0];
    assert_eq!(usage.len(), 3);
    assert!(usage.iter().all(|p| p.measurement == "usage"));
    // Gas-seeded intervals first, then the unmatched electricity one.
    let stamps: Vec<_> = usage.iter().map(|p| p.timestamp).collect();
    assert_eq!(stamps, vec![slot(0), slot(1), slot(2)]);
    assert_eq!(usage[0].field_value("electricity"), None);
    assert_eq!(usage[1].field_value("gas"), Some(2.0));
    assert_eq!(usage[1].field_value("electricity"), Some(0.5));
    assert_eq!(usage[2].field_value("gas"), None);

    let costs = &batches[1];
    assert_eq!(costs.len(), 3);
    for point in costs {
        assert_eq!(point.measurement, "costs");
        assert_eq!(point.tag_value("type"), Some("electricity"));
        assert_eq!(point.tag_value("tariff"), Some("Agile"));
        assert_abs_diff_eq!(point.field_value("standingCharge").unwrap(), 0.48, epsilon = 1e-12);
        assert_abs_diff_eq!(point.field_value("unitRate").unwrap(), 0.20, epsilon = 1e-12);
    }
    // Slot 0 has no electricity reading: standing charge share only.
    assert_abs_diff_eq!(costs[0].field_value("cost").unwrap(), 0.01, epsilon = 1e-12);
    assert_abs_diff_eq!(costs[1].field_value("cost").unwrap(), 0.01 + 0.5 * 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(costs[2].field_value("cost").unwrap(), 0.01 + 0.7 * 0.2, epsilon = 1e-12);
}

#[tokio::test]
async fn test_two_tariffs_each_interval_costed_twice() {
    let mock = MockOctopus::new();
    let sink = MemorySink::default();
    route_full_rates(&mock, &tracker(), 24.0, 10.0);
    route_full_rates(&mock, &agile(), 48.0, 20.0);
    route_consumption(&mock);

    let report = poller(&mock, &sink, vec![tracker(), agile()]).poll(window()).await.unwrap();
    assert_eq!(report.intervals, 3);
    assert_eq!(report.cost_entries, 6);

    let costs = &sink.batches()[1];
    let tariffs: Vec<_> = costs.iter().map(|p| p.tag_value("tariff").unwrap()).collect();
    assert_eq!(tariffs, vec!["Tracker", "Agile", "Tracker", "Agile", "Tracker", "Agile"]);

    // Slot 1: gas 2.0 under Tracker (0.24/48 + 2.0 × 0.10).
    assert_abs_diff_eq!(costs[2].field_value("cost").unwrap(), 0.005 + 0.2, epsilon = 1e-12);
}

#[tokio::test]
async fn test_paginated_consumption_fetches_every_page() {
    let mock = MockOctopus::new();
    let sink = MemorySink::default();
    route_full_rates(&mock, &tracker(), 24.0, 10.0);

    let urls = urls();
    mock.paged(
        &urls.consumption_url(Commodity::Gas, &window()),
        vec![
            vec![consumption(0, 1.0), consumption(1, 1.0)],
            vec![consumption(2, 1.0), consumption(3, 1.0)],
            vec![consumption(4, 1.0)],
        ],
    );
    mock.paged(&urls.consumption_url(Commodity::Electricity, &window()), vec![vec![]]);

    let report = poller(&mock, &sink, vec![tracker()]).poll(window()).await.unwrap();

    assert_eq!(mock.requests_matching("/gas-meter-points/"), 3);
    assert_eq!(mock.requests_matching("/electricity-meter-points/"), 1);
    assert_eq!(report.gas_records, 5);
    assert_eq!(report.intervals, 5);

    let stamps: Vec<_> = sink.batches()[0].iter().map(|p| p.timestamp).collect();
    assert_eq!(stamps, (0..5).map(slot).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_rate_gap_aborts_cycle_without_writing() {
    let mock = MockOctopus::new();
    let sink = MemorySink::default();
    route_consumption(&mock);

    // Standing charges only start at slot 1, leaving slot 0 uncovered.
    let urls = urls();
    mock.paged(
        &urls.rates_url(&agile(), RateKind::StandingCharge, &window()),
        vec![vec![rate(48.0, slot(1), None)]],
    );
    mock.paged(
        &urls.rates_url(&agile(), RateKind::UnitRate, &window()),
        vec![vec![rate(20.0, window() - Duration::days(1), None)]],
    );

    let err = poller(&mock, &sink, vec![agile()]).poll(window()).await.unwrap_err();

    match err.downcast_ref::<PollerError>() {
        Some(PollerError::RateNotFound { tariff, kind, at }) => {
            assert_eq!(tariff, "Agile");
            assert_eq!(*kind, RateKind::StandingCharge);
            assert_eq!(*at, slot(0));
        }
        other => panic!("expected RateNotFound, got {other:?}"),
    }
    assert!(err.to_string().contains("2024-01-01T00:00:00.000Z"));
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn test_malformed_page_aborts_cycle_without_writing() {
    let mock = MockOctopus::new();
    let sink = MemorySink::default();
    route_full_rates(&mock, &agile(), 48.0, 20.0);
    route_consumption(&mock);

    // Replace the electricity consumption page with a broken envelope.
    mock.route(
        urls().consumption_url(Commodity::Electricity, &window()),
        serde_json::json!({ "detail": "Authentication credentials were not provided." }),
    );

    let err = poller(&mock, &sink, vec![agile()]).poll(window()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PollerError>(),
        Some(PollerError::MalformedResponse { .. })
    ));
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn test_transport_failure_aborts_cycle() {
    let mock = MockOctopus::new();
    let sink = MemorySink::default();
    route_consumption(&mock);
    // No rate routes at all: the mock answers 404.

    let result = poller(&mock, &sink, vec![agile()]).poll(window()).await;
    assert!(result.is_err());
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn test_requested_urls_match_templates() {
    let mock = MockOctopus::new();
    let sink = MemorySink::default();
    route_full_rates(&mock, &agile(), 48.0, 20.0);
    route_consumption(&mock);

    poller(&mock, &sink, vec![agile()]).poll(window()).await.unwrap();

    let mut requests = mock.requests();
    requests.sort();
    let mut expected = vec![
        format!(
            "{BASE_URL}/electricity-meter-points/1200000000001/meters/21L0000001/consumption\
             ?period_from=2024-01-01T00:00:00.000Z&page_size=25000"
        ),
        format!(
            "{BASE_URL}/gas-meter-points/3000000001/meters/E6S00000000001/consumption\
             ?period_from=2024-01-01T00:00:00.000Z&page_size=25000"
        ),
        format!(
            "{BASE_URL}/products/AGILE-18-02-21/electricity-tariffs/E-1R-AGILE-18-02-21-C\
             /standard-unit-rates?period_from=2024-01-01T00:00:00.000Z&page_size=10000"
        ),
        format!(
            "{BASE_URL}/products/AGILE-18-02-21/electricity-tariffs/E-1R-AGILE-18-02-21-C\
             /standing-charges?period_from=2024-01-01T00:00:00.000Z&page_size=10000"
        ),
    ];
    expected.sort();
    assert_eq!(requests, expected);
}

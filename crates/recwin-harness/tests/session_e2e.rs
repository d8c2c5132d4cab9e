#![forbid(unsafe_code)]

//! End-to-end sessions: scroll a synthetic dataset to the bottom through the
//! deferred source and check what the engine ends up holding.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use recwin_core::{EngineConfig, ListStatus, QueryParams, SortOrder};
use recwin_harness::{FailurePlan, MemorySource, Session, SessionConfig, SessionReport, generate};

#[derive(Debug, PartialEq)]
struct Outcome {
    status: ListStatus,
    records_seen: usize,
    window_offset: usize,
    window_len: usize,
    total: Option<u64>,
    contiguity_violations: usize,
    invariant_violations: Vec<String>,
}

impl From<&SessionReport> for Outcome {
    fn from(r: &SessionReport) -> Self {
        Self {
            status: r.status,
            records_seen: r.records_seen,
            window_offset: r.window_offset,
            window_len: r.window_len,
            total: r.total,
            contiguity_violations: r.contiguity_violations,
            invariant_violations: r.invariant_violations.clone(),
        }
    }
}

fn small_config() -> SessionConfig {
    SessionConfig {
        engine: EngineConfig::default()
            .with_max_window_size(300)
            .with_page_size(100),
        dataset_size: 1_200,
        seed: 7,
        latency_ticks: 0,
        steps: 5_000,
        ..SessionConfig::default()
    }
}

fn matching(config: &SessionConfig, query: &QueryParams) -> usize {
    MemorySource::new(generate(config.dataset_size, config.seed))
        .matching_ids(query)
        .map(|ids| ids.len())
        .unwrap_or(0)
}

// ============================================================================
// Full scroll
// ============================================================================

#[test]
fn scroll_to_bottom_keeps_last_window() {
    let report = Session::run(small_config()).unwrap();
    assert_eq!(
        Outcome::from(&report),
        Outcome {
            status: ListStatus::Complete,
            records_seen: 1_200,
            window_offset: 900,
            window_len: 300,
            total: Some(1_200),
            contiguity_violations: 0,
            invariant_violations: vec![],
        }
    );
    assert_eq!(report.peak_window_len, 300);
    assert!(report.peak_measured <= 300);
    // Twelve full pages plus the empty one that signals the end.
    assert_eq!(report.engine.pages_applied, 13);
    assert_eq!(report.engine.fetches_issued, 13);
    assert_eq!(report.engine.records_evicted, 900);
    assert_eq!(report.engine.failures, 0);
    assert!(report.steps < 5_000);
}

#[test]
fn unmeasured_rows_still_complete() {
    let config = SessionConfig {
        measure_rows: false,
        ..small_config()
    };
    let report = Session::run(config).unwrap();
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.status, ListStatus::Complete);
    assert_eq!(report.records_seen, 1_200);
    assert_eq!(report.peak_measured, 0);
}

// ============================================================================
// Query change while a fetch is in flight
// ============================================================================

#[test]
fn requery_discards_stale_page() {
    let requery = QueryParams::default()
        .with_filter("cache")
        .with_sort("priority", SortOrder::Desc);
    let config = SessionConfig {
        latency_ticks: 2,
        requery_at: Some(0),
        requery: requery.clone(),
        ..small_config()
    };
    let expected = matching(&config, &requery);
    assert!(expected > 0);

    let report = Session::run(config).unwrap();
    assert_eq!(report.engine.stale_discarded, 1);
    assert_eq!(report.engine.resets, 2);
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.status, ListStatus::Complete);
    assert_eq!(report.records_seen, expected);
    assert_eq!(report.total, Some(expected as u64));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn injected_failures_are_retried() {
    let config = SessionConfig {
        failures: FailurePlan::Every(3),
        ..small_config()
    };
    let report = Session::run(config).unwrap();
    assert!(report.failures_seen > 0);
    assert_eq!(report.retries, report.failures_seen);
    assert_eq!(report.engine.failures, report.failures_seen as u64);
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.status, ListStatus::Complete);
    assert_eq!(report.records_seen, 1_200);
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn filter_matching_nothing_is_empty() {
    let config = SessionConfig {
        query: QueryParams::default().with_filter("no such word anywhere"),
        ..small_config()
    };
    let report = Session::run(config).unwrap();
    assert_eq!(
        Outcome::from(&report),
        Outcome {
            status: ListStatus::Empty,
            records_seen: 0,
            window_offset: 0,
            window_len: 0,
            total: Some(0),
            contiguity_violations: 0,
            invariant_violations: vec![],
        }
    );
}

#[test]
fn expanding_rows_keeps_window_consistent() {
    let config = SessionConfig {
        expand_every: 5,
        ..small_config()
    };
    let report = Session::run(config).unwrap();
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.status, ListStatus::Complete);
}

#[test]
fn report_serializes_to_json() {
    let config = SessionConfig {
        steps: 10,
        ..small_config()
    };
    let report = Session::run(config).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["steps"], 10);
    assert!(json["status"].is_string());
    assert!(json["engine"]["fetches_issued"].as_u64().unwrap() >= 1);
}

// ============================================================================
// Property: any small session stays consistent
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn sessions_stay_clean(
        seed in any::<u64>(),
        page in 10usize..80,
        extra in 0usize..200,
        latency in 0u64..4,
        fail_every in 0usize..6,
        step in 100u64..3_000,
    ) {
        let config = SessionConfig {
            engine: EngineConfig::default()
                .with_max_window_size(page + extra)
                .with_page_size(page),
            dataset_size: 400,
            seed,
            latency_ticks: latency,
            failures: FailurePlan::Every(fail_every),
            scroll_step: step,
            steps: 600,
            ..SessionConfig::default()
        };
        let report = Session::run(config).unwrap();
        prop_assert!(report.is_clean(), "{:?}", report);
        prop_assert!(report.peak_window_len <= page + extra);
        prop_assert!(report.records_seen <= 400);
    }
}

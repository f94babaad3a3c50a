//! Behavior tests for metric collection.
//!
//! Providers are scripted in-process; storage is either the in-memory store
//! or a real DuckDB warehouse in a temp directory.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use pulsetick_core::{
    format_timestamp, parse_date, Collector, CollectorSettings, MemoryStore, MetricFamily,
    MetricSample, MetricStore, ProviderId, RawTimestamp, RawValue, ResultStatus, SeriesField,
    SeriesPoint, SeriesRequest, SeriesSource, SourceError, SourceSet, Warehouse, WarehouseConfig,
};
use tempfile::tempdir;

struct ScriptedSource {
    provider: ProviderId,
    series: HashMap<&'static str, Result<Vec<SeriesPoint>, SourceError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            series: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_series(mut self, identifier: &'static str, points: Vec<SeriesPoint>) -> Self {
        self.series.insert(identifier, Ok(points));
        self
    }

    fn with_failure(mut self, identifier: &'static str, error: SourceError) -> Self {
        self.series.insert(identifier, Err(error));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl SeriesSource for ScriptedSource {
    fn id(&self) -> ProviderId {
        self.provider
    }

    fn fetch<'a>(
        &'a self,
        req: SeriesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeriesPoint>, SourceError>> + Send + 'a>> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(req.identifier.clone());
        let response = self
            .series
            .get(req.identifier.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        Box::pin(async move { response })
    }
}

/// A Yahoo daily bar stamped at the 09:30 New York open.
fn bar(date: &str, open: Option<f64>, close: Option<f64>) -> SeriesPoint {
    let timestamp = RawTimestamp::parse(&format!("{date}T14:30:00Z")).expect("timestamp");
    let cell = |value: Option<f64>| value.map_or(RawValue::Null, RawValue::Number);
    SeriesPoint::new(timestamp)
        .with_value(SeriesField::Open, cell(open))
        .with_value(SeriesField::Close, cell(close))
}

fn observation(date: &str, value: &str) -> SeriesPoint {
    SeriesPoint::new(RawTimestamp::parse(date).expect("date"))
        .with_value(SeriesField::Value, RawValue::Text(value.to_owned()))
}

fn three_sessions() -> Vec<SeriesPoint> {
    vec![
        bar("2024-01-02", Some(99.0), Some(100.0)),
        bar("2024-01-03", Some(106.0), Some(105.0)),
        bar("2024-01-04", Some(104.0), Some(103.0)),
    ]
}

fn samples_named<'a>(samples: &'a [MetricSample], name: &str) -> Vec<&'a MetricSample> {
    samples
        .iter()
        .filter(|sample| sample.metric_name == name)
        .collect()
}

#[tokio::test]
async fn nq_close_falls_back_to_next_ticker_and_records_it_as_source() {
    // Given: the front-month future returns nothing but the index has data
    let yahoo = ScriptedSource::new(ProviderId::Yahoo)
        .with_series("NQ=F", Vec::new())
        .with_series("^NDX", three_sessions());
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let store = MemoryStore::new();

    // When: the NQ close collector runs
    let collector = Collector::new(&sources, &store, CollectorSettings::default());
    let result = collector.collect(MetricFamily::NqClose).await;

    // Then: every day is stored against the fallback ticker
    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.records_processed(), 3);
    assert_eq!(result.source_used(), Some("Yahoo Finance (^NDX)"));

    let samples = store.samples();
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|sample| sample.source == "Yahoo Finance (^NDX)"));
    assert_eq!(format_timestamp(&samples[0].timestamp), "2024-01-02T00:00:00-05:00");
    assert_eq!(samples[0].metric_value, Some(100.0));
}

#[tokio::test]
async fn exhausted_candidates_report_error_with_zero_records() {
    // Given: every put/call candidate is empty or failing
    let yahoo = ScriptedSource::new(ProviderId::Yahoo)
        .with_series("^PCCE", Vec::new())
        .with_failure("^CPC", SourceError::unavailable("yahoo returned status 500 for ^CPC"))
        .with_series("^PCR", Vec::new());
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let store = MemoryStore::new();

    // When: the put/call collector runs
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::PutCallRatio)
        .await;

    // Then: it is a run-level error and nothing was written
    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.records_processed(), 0);
    assert!(result.message.starts_with("No data retrieved from Yahoo Finance"));
    let details = result.details.as_ref().expect("details kept for provider errors");
    assert_eq!(details.attempts.len(), 3);
    assert!(store.samples().is_empty());

    // And: the run is still in the audit log
    let runs = store.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, ResultStatus::Error);
}

#[tokio::test]
async fn fred_sentinel_day_is_skipped_without_counting_as_failure() {
    // Given: FRED marks the holiday with "."
    let fred = ScriptedSource::new(ProviderId::Fred).with_series(
        "DGS10",
        vec![
            observation("2024-01-12", "3.94"),
            observation("2024-01-15", "."),
            observation("2024-01-16", "4.06"),
        ],
    );
    let sources = SourceSet::new().with_source(Arc::new(fred));
    let store = MemoryStore::new();

    // When: the treasury collector runs
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::TreasuryYield)
        .await;

    // Then: only real observations are stored and counted
    assert!(result.is_success());
    let details = result.details.as_ref().expect("details");
    assert_eq!(details.records_processed, 2);
    assert_eq!(details.skipped_sentinel, 1);
    assert_eq!(details.failed_entries, 0);
    assert_eq!(details.source.as_deref(), Some("FRED (DGS10)"));

    let holiday = parse_date("2024-01-15").expect("date");
    assert!(store.samples().iter().all(|sample| sample.trade_date() != holiday));
    // Bare dates stay on their own calendar day.
    assert_eq!(
        format_timestamp(&store.samples()[0].timestamp),
        "2024-01-12T00:00:00-05:00"
    );
}

#[tokio::test]
async fn unreadable_fred_date_counts_as_failed_entry() {
    // Given: one observation carries a date that cannot be read
    let fred = ScriptedSource::new(ProviderId::Fred).with_series(
        "DGS10",
        vec![
            observation("2024-01-12", "3.94"),
            SeriesPoint::unreadable("2024-13-40")
                .with_value(SeriesField::Value, RawValue::Text(String::from("4.00"))),
            observation("2024-01-16", "4.06"),
        ],
    );
    let sources = SourceSet::new().with_source(Arc::new(fred));
    let store = MemoryStore::new();

    // When: the treasury collector runs
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::TreasuryYield)
        .await;

    // Then: the run succeeds and the bad row is reported, not silently lost
    assert!(result.is_success());
    let details = result.details.as_ref().expect("details");
    assert_eq!(details.fetched_entries, 3);
    assert_eq!(details.records_processed, 2);
    assert_eq!(details.failed_entries, 1);
    assert_eq!(details.skipped_sentinel, 0);
    assert_eq!(store.samples().len(), 2);
}

#[tokio::test]
async fn missing_fred_key_fails_before_any_fetch() {
    // Given: only Yahoo is configured
    let yahoo =
        Arc::new(ScriptedSource::new(ProviderId::Yahoo).with_series("^VIX", three_sessions()));
    let sources = SourceSet::new().with_source(yahoo.clone());
    let store = MemoryStore::new();

    // When: the treasury collector runs
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::TreasuryYield)
        .await;

    // Then: a configuration error without details, and no provider was called
    assert_eq!(result.status, ResultStatus::Error);
    assert!(result.message.contains("PULSETICK_FRED_API_KEY"));
    let json = serde_json::to_value(&result).expect("json");
    assert!(json.get("details").is_none());
    assert!(yahoo.calls().is_empty());
}

#[tokio::test]
async fn malformed_entry_is_skipped_and_the_run_still_succeeds() {
    // Given: one bar carries text where a number belongs
    let garbled = SeriesPoint::new(RawTimestamp::parse("2024-01-03T14:30:00Z").expect("ts"))
        .with_value(SeriesField::Close, RawValue::Text(String::from("n/a")));
    let yahoo = ScriptedSource::new(ProviderId::Yahoo).with_series(
        "^VIX",
        vec![bar("2024-01-02", Some(13.0), Some(13.2)), garbled],
    );
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let store = MemoryStore::new();

    // When
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::VixLevel)
        .await;

    // Then
    assert!(result.is_success());
    let details = result.details.as_ref().expect("details");
    assert_eq!(details.records_processed, 1);
    assert_eq!(details.failed_entries, 1);
    assert_eq!(details.fetched_entries, 2);
}

#[tokio::test]
async fn overnight_gap_matches_worked_example() {
    // Given: closes 100, 105, 103 and opens _, 106, 104
    let yahoo = ScriptedSource::new(ProviderId::Yahoo).with_series("NQ=F", three_sessions());
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let store = MemoryStore::new();

    // When
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::OvernightGap)
        .await;

    // Then: two gap days, each with points and percent at the same timestamp
    assert_eq!(result.records_processed(), 2);
    let samples = store.samples();
    let points = samples_named(&samples, "overnight_gap_points");
    let percent = samples_named(&samples, "overnight_gap_percent");
    assert_eq!(points.len(), 2);
    assert_eq!(percent.len(), 2);

    assert_eq!(points[0].trade_date(), parse_date("2024-01-03").expect("date"));
    assert_eq!(points[0].metric_value, Some(6.0));
    assert_eq!(percent[0].metric_value, Some(6.0));
    assert_eq!(points[0].timestamp, percent[0].timestamp);

    assert_eq!(points[1].metric_value, Some(-1.0));
    let day3 = percent[1].metric_value.expect("percent");
    assert!((day3 + 0.952_380_952).abs() < 1e-6, "{day3}");
}

#[tokio::test]
async fn gap_day_counts_only_when_both_writes_succeed() {
    // Given: the store rejects the percent row for the last day
    let yahoo = ScriptedSource::new(ProviderId::Yahoo).with_series("NQ=F", three_sessions());
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let store = MemoryStore::new();
    store.fail_writes_for(parse_date("2024-01-04").expect("date"), "overnight_gap_percent");

    // When
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::OvernightGap)
        .await;

    // Then: the day is reported as failed, the run still succeeds
    assert!(result.is_success());
    let details = result.details.as_ref().expect("details");
    assert_eq!(details.records_processed, 1);
    assert_eq!(details.failed_entries, 1);
}

#[tokio::test]
async fn zero_previous_close_stores_null_percent() {
    let yahoo = ScriptedSource::new(ProviderId::Yahoo).with_series(
        "NQ=F",
        vec![
            bar("2024-01-02", Some(1.0), Some(0.0)),
            bar("2024-01-03", Some(2.5), Some(3.0)),
        ],
    );
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let store = MemoryStore::new();

    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::OvernightGap)
        .await;

    assert_eq!(result.records_processed(), 1);
    let samples = store.samples();
    assert_eq!(samples_named(&samples, "overnight_gap_points")[0].metric_value, Some(2.5));
    assert_eq!(samples_named(&samples, "overnight_gap_percent")[0].metric_value, None);
}

#[tokio::test]
async fn collecting_the_same_window_twice_is_idempotent() {
    // Given: a file-backed warehouse
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::for_home(temp.path())).expect("warehouse");
    let yahoo = ScriptedSource::new(ProviderId::Yahoo).with_series("^VIX", three_sessions());
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let collector = Collector::new(&sources, &warehouse, CollectorSettings::default());

    // When: the same window is collected twice
    let first = collector.collect(MetricFamily::VixLevel).await;
    let after_first = warehouse.count_metric("vix_level").expect("count");
    let second = collector.collect(MetricFamily::VixLevel).await;
    let after_second = warehouse.count_metric("vix_level").expect("count");

    // Then: row count and values are unchanged
    assert_eq!(first.records_processed(), 3);
    assert_eq!(second.records_processed(), 3);
    assert_eq!(after_first, 3);
    assert_eq!(after_second, 3);

    let window = CollectorSettings::default().window.through_end();
    let rows = MetricStore::query(
        &warehouse,
        &["vix_level"],
        &window,
        &CollectorSettings::default().normalizer,
    )
    .expect("query");
    let values: Vec<Option<f64>> = rows.iter().map(|row| row.metric_value).collect();
    assert_eq!(values, vec![Some(100.0), Some(105.0), Some(103.0)]);

    // And: both runs were audited
    assert_eq!(warehouse.recent_runs(10).expect("runs").len(), 2);
}

#[tokio::test]
async fn collect_all_runs_every_family_and_tolerates_failures() {
    // Given: Yahoo has NQ and VIX data, no put/call data, and FRED is unconfigured
    let yahoo = ScriptedSource::new(ProviderId::Yahoo)
        .with_series("NQ=F", three_sessions())
        .with_series("^VIX", three_sessions());
    let sources = SourceSet::new().with_source(Arc::new(yahoo));
    let store = MemoryStore::new();

    // When
    let report = Collector::new(&sources, &store, CollectorSettings::default())
        .collect_all()
        .await;

    // Then
    assert_eq!(report.total, 5);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.status, ResultStatus::Success);
    assert_eq!(report.message, "Data collection completed: 3/5 collectors succeeded");

    let failed: Vec<MetricFamily> = report
        .results
        .iter()
        .filter(|entry| !entry.result.is_success())
        .map(|entry| entry.family)
        .collect();
    assert_eq!(failed, vec![MetricFamily::TreasuryYield, MetricFamily::PutCallRatio]);
    assert_eq!(store.runs().len(), 5);
}

//! Provider contract tests.
//!
//! Real adapters wired through `SourceSet::standard` talk to a routed fake
//! transport, so URL shape, status handling, and payload parsing are checked
//! together with the collector that consumes them.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use pulsetick_core::{
    Collector, CollectorSettings, HttpClient, HttpError, HttpRequest, HttpResponse, MemoryStore,
    MetricFamily, ResultStatus, SourceSet,
};

const FRED_KEY: &str = "contract-test-key";

// ============================================================================
// Fake transport
// ============================================================================

/// Answers each request with the first route whose needle appears in the URL.
/// Unrouted URLs get a 404.
struct RoutedHttpClient {
    routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    fn new() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn route(mut self, needle: &'static str, response: Result<HttpResponse, HttpError>) -> Self {
        self.routes.push((needle, response));
        self
    }

    fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(needle, _)| request.url.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(HttpResponse::with_status(404, "{}")));
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
        Box::pin(async move { response })
    }
}

/// Chart body for sessions opening at 09:30 New York on Jan 2, 3 and 4, 2024.
fn chart_body(opens: [f64; 3], closes: [f64; 3]) -> String {
    serde_json::json!({
        "chart": {
            "result": [{
                "meta": {"symbol": "X", "currency": "USD"},
                "timestamp": [1_704_205_800_i64, 1_704_292_200_i64, 1_704_378_600_i64],
                "indicators": {"quote": [{"open": opens, "close": closes}]}
            }],
            "error": null
        }
    })
    .to_string()
}

fn run_with(http: RoutedHttpClient) -> (Arc<RoutedHttpClient>, SourceSet) {
    let http = Arc::new(http);
    let sources = SourceSet::standard(http.clone(), Some(FRED_KEY), 5_000);
    (http, sources)
}

// ============================================================================
// Yahoo Finance
// ============================================================================

#[tokio::test]
async fn yahoo_unknown_symbol_falls_through_to_index() {
    // Given: the future is unknown (404) and the index has three sessions
    let (http, sources) = run_with(RoutedHttpClient::new().route(
        "%5ENDX",
        Ok(HttpResponse::ok_json(chart_body(
            [16_800.0, 16_590.0, 16_420.0],
            [16_543.9, 16_368.5, 16_282.0],
        ))),
    ));
    let store = MemoryStore::new();

    // When
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::NqClose)
        .await;

    // Then: the future was tried first, the index supplied the data
    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.records_processed(), 3);
    assert_eq!(result.source_used(), Some("Yahoo Finance (^NDX)"));

    let urls = http.urls();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].contains("/NQ%3DF?"));
    assert!(urls[1].contains("period1=1704067200"));
    assert!(urls[1].contains("period2=1706659200"));
    assert!(urls[1].contains("interval=1d"));
}

#[tokio::test]
async fn yahoo_chart_error_body_counts_as_failed_candidate() {
    // Given: every put/call symbol answers with a chart error object
    let error_body = r#"{"chart":{"result":null,"error":{"code":"Not Found",
        "description":"No data found, symbol may be delisted"}}}"#;
    let (_http, sources) = run_with(
        RoutedHttpClient::new().route("finance.yahoo.com", Ok(HttpResponse::ok_json(error_body))),
    );
    let store = MemoryStore::new();

    // When
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::PutCallRatio)
        .await;

    // Then: each candidate is reported with the provider's description
    assert_eq!(result.status, ResultStatus::Error);
    assert!(result.message.contains("symbol may be delisted"));
    let attempts = &result.details.as_ref().expect("details").attempts;
    assert_eq!(attempts.len(), 3);
    assert!(attempts[0].starts_with("^PCCE:"));
}

#[tokio::test]
async fn yahoo_null_close_is_a_sentinel_not_a_failure() {
    let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
        "indicators":{"quote":[{"open":[13.1,null],"close":[13.2,null]}]}}],"error":null}}"#;
    let (_http, sources) =
        run_with(RoutedHttpClient::new().route("%5EVIX", Ok(HttpResponse::ok_json(body))));
    let store = MemoryStore::new();

    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::VixLevel)
        .await;

    let details = result.details.as_ref().expect("details");
    assert_eq!(details.records_processed, 1);
    assert_eq!(details.skipped_sentinel, 1);
    assert_eq!(details.failed_entries, 0);
}

#[tokio::test]
async fn transport_timeout_exhausts_single_candidate() {
    let (_http, sources) = run_with(
        RoutedHttpClient::new()
            .route("%5EVIX", Err(HttpError::timeout("request timed out after 5000ms"))),
    );
    let store = MemoryStore::new();

    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::VixLevel)
        .await;

    assert_eq!(result.status, ResultStatus::Error);
    assert!(result.message.contains("timed out"));
    assert_eq!(store.upsert_calls(), 0);
}

// ============================================================================
// FRED
// ============================================================================

#[tokio::test]
async fn fred_observations_flow_into_treasury_yield() {
    // Given: FRED returns a holiday sentinel between two observations
    let body = r#"{"observations":[
        {"date":"2024-01-12","value":"3.94"},
        {"date":"2024-01-15","value":"."},
        {"date":"2024-01-16","value":"4.06"}
    ]}"#;
    let (http, sources) =
        run_with(RoutedHttpClient::new().route("series_id=DGS10", Ok(HttpResponse::ok_json(body))));
    let store = MemoryStore::new();

    // When
    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::TreasuryYield)
        .await;

    // Then
    assert!(result.is_success(), "{}", result.message);
    let details = result.details.as_ref().expect("details");
    assert_eq!(details.records_processed, 2);
    assert_eq!(details.skipped_sentinel, 1);

    let urls = http.urls();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("file_type=json"));
    assert!(urls[0].contains("observation_start=2024-01-01"));
    assert!(urls[0].contains("observation_end=2024-01-31"));
    assert!(urls[0].contains(&format!("api_key={FRED_KEY}")));
}

#[tokio::test]
async fn fred_rejection_surfaces_provider_message_without_the_key() {
    let body = r#"{"error_code":400,
        "error_message":"Bad Request.  The value for variable api_key is not registered."}"#;
    let (_http, sources) = run_with(
        RoutedHttpClient::new().route("series_id=DGS10", Ok(HttpResponse::with_status(400, body))),
    );
    let store = MemoryStore::new();

    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::TreasuryYield)
        .await;

    assert_eq!(result.status, ResultStatus::Error);
    assert!(result.message.contains("not registered"));
    let json = serde_json::to_string(&result).expect("json");
    assert!(!json.contains(FRED_KEY));
}

#[tokio::test]
async fn blank_fred_key_leaves_treasury_unconfigured() {
    let http: Arc<dyn HttpClient> = Arc::new(RoutedHttpClient::new());
    let sources = SourceSet::standard(http, Some("   "), 5_000);
    let store = MemoryStore::new();

    let result = Collector::new(&sources, &store, CollectorSettings::default())
        .collect(MetricFamily::TreasuryYield)
        .await;

    assert_eq!(result.status, ResultStatus::Error);
    assert!(result.details.is_none());
    assert!(result.message.starts_with("FRED is not configured"));
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use crate::data_source::{
    RawValue, SeriesField, SeriesPoint, SeriesRequest, SeriesSource, SourceError,
};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{ProviderId, RawTimestamp};

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Daily bars from the Yahoo Finance chart endpoint.
///
/// `period1`/`period2` are UTC midnights of the window bounds, so the end
/// date's own session is excluded.
#[derive(Clone)]
pub struct YahooChartSource {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl YahooChartSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(YAHOO_CHART_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn endpoint(&self, req: &SeriesRequest) -> String {
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history&includePrePost=false",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&req.identifier),
            utc_midnight_seconds(req.window.start()),
            utc_midnight_seconds(req.window.end()),
        )
    }

    async fn fetch_chart(&self, req: SeriesRequest) -> Result<Vec<SeriesPoint>, SourceError> {
        let request = HttpRequest::get(self.endpoint(&req))
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
        })?;

        if response.status == 404 {
            // Unknown symbols come back as 404 with a chart error body.
            tracing::debug!(identifier = %req.identifier, "yahoo reports no such symbol");
            return Ok(Vec::new());
        }
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "yahoo returned status {} for {}",
                response.status, req.identifier
            )));
        }

        parse_chart(&response.body)
    }
}

impl SeriesSource for YahooChartSource {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch<'a>(
        &'a self,
        req: SeriesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeriesPoint>, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_chart(req))
    }
}

fn utc_midnight_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Parse a chart payload into open/close points.
///
/// A result without a `timestamp` array is a window with no sessions and
/// yields an empty series.
pub fn parse_chart(body: &str) -> Result<Vec<SeriesPoint>, SourceError> {
    let payload: YahooChartResponse = serde_json::from_str(body)
        .map_err(|error| SourceError::malformed(format!("failed to parse yahoo chart: {error}")))?;

    if let Some(error) = payload.chart.error.filter(|error| !error.is_null()) {
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_owned);
        return Err(SourceError::unavailable(format!("yahoo chart API error: {description}")));
    }

    let Some(result) = payload.chart.result.and_then(|results| results.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };
    let quote = result
        .indicators
        .and_then(|indicators| indicators.quote.into_iter().next())
        .ok_or_else(|| SourceError::malformed("yahoo chart has timestamps but no quote block"))?;
    if quote.open.len() != timestamps.len() || quote.close.len() != timestamps.len() {
        return Err(SourceError::malformed(format!(
            "yahoo chart columns are truncated: {} timestamps, {} opens, {} closes",
            timestamps.len(),
            quote.open.len(),
            quote.close.len()
        )));
    }

    let mut points = Vec::with_capacity(timestamps.len());
    for (index, seconds) in timestamps.into_iter().enumerate() {
        let timestamp = RawTimestamp::from_unix_seconds(seconds).ok_or_else(|| {
            SourceError::malformed(format!("yahoo timestamp {seconds} is out of range"))
        })?;
        points.push(
            SeriesPoint::new(timestamp)
                .with_value(SeriesField::Open, cell(&quote.open, index))
                .with_value(SeriesField::Close, cell(&quote.close, index)),
        );
    }
    Ok(points)
}

fn cell(column: &[Option<f64>], index: usize) -> RawValue {
    match column.get(index).copied().flatten() {
        Some(value) => RawValue::Number(value),
        None => RawValue::Null,
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<YahooChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

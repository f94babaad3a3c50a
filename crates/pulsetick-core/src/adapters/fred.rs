use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::data_source::{
    RawValue, SeriesField, SeriesPoint, SeriesRequest, SeriesSource, SourceError,
};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{ProviderId, RawTimestamp};

pub const FRED_OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Daily observations from the FRED series API.
///
/// Observation dates are bare calendar dates and both window bounds are
/// inclusive. The API key travels in the query string and is never logged.
#[derive(Clone)]
pub struct FredSource {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
}

impl FredSource {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: String::from(FRED_OBSERVATIONS_URL),
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
            "{}?series_id={}&api_key={}&file_type=json&observation_start={}&observation_end={}",
            self.base_url,
            urlencoding::encode(&req.identifier),
            urlencoding::encode(&self.api_key),
            req.window.start().format("%Y-%m-%d"),
            req.window.end().format("%Y-%m-%d"),
        )
    }

    async fn fetch_observations(
        &self,
        req: SeriesRequest,
    ) -> Result<Vec<SeriesPoint>, SourceError> {
        let request = HttpRequest::get(self.endpoint(&req)).with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!("fred transport error: {}", error.message()))
        })?;

        if !response.is_success() {
            let detail = serde_json::from_str::<FredErrorBody>(&response.body)
                .ok()
                .and_then(|body| body.error_message)
                .unwrap_or_default();
            return Err(SourceError::unavailable(format!(
                "fred returned status {} for {}: {}",
                response.status, req.identifier, detail
            )));
        }

        parse_observations(&response.body)
    }
}

impl SeriesSource for FredSource {
    fn id(&self) -> ProviderId {
        ProviderId::Fred
    }

    fn fetch<'a>(
        &'a self,
        req: SeriesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeriesPoint>, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_observations(req))
    }
}

/// Parse an observations payload.
///
/// Values stay raw, so `"."` reaches the collector as a sentinel. An
/// observation whose date cannot be read is passed on as unreadable.
pub fn parse_observations(body: &str) -> Result<Vec<SeriesPoint>, SourceError> {
    let payload: FredObservationsResponse = serde_json::from_str(body).map_err(|error| {
        SourceError::malformed(format!("failed to parse fred observations: {error}"))
    })?;
    let observations = payload
        .observations
        .ok_or_else(|| SourceError::malformed("fred payload has no observations array"))?;

    let mut points = Vec::with_capacity(observations.len());
    for observation in observations {
        let point = match observation.date {
            Some(date) => match RawTimestamp::parse(&date) {
                Ok(timestamp) => SeriesPoint::new(timestamp),
                Err(_) => SeriesPoint::unreadable(date),
            },
            None => SeriesPoint::unreadable(""),
        };
        let value = match observation.value {
            None | Some(Value::Null) => RawValue::Null,
            Some(Value::String(text)) => RawValue::Text(text),
            Some(Value::Number(number)) => number.as_f64().map_or(RawValue::Null, RawValue::Number),
            Some(other) => RawValue::Text(other.to_string()),
        };
        points.push(point.with_value(SeriesField::Value, value));
    }
    Ok(points)
}

#[derive(Debug, Deserialize)]
struct FredObservationsResponse {
    #[serde(default)]
    observations: Option<Vec<FredObservation>>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FredErrorBody {
    #[serde(default)]
    error_message: Option<String>,
}

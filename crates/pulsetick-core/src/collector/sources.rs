use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapters::{FredSource, YahooChartSource};
use crate::data_source::SeriesSource;
use crate::http_client::HttpClient;
use crate::ProviderId;

/// Configured provider adapters, at most one per provider.
///
/// A provider without an adapter is unconfigured; collectors that need it
/// fail fast with a configuration error.
#[derive(Clone, Default)]
pub struct SourceSet {
    sources: BTreeMap<ProviderId, Arc<dyn SeriesSource>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yahoo always, FRED only when an API key is available.
    pub fn standard(
        http_client: Arc<dyn HttpClient>,
        fred_api_key: Option<&str>,
        timeout_ms: u64,
    ) -> Self {
        let mut sources = Self::new().with_source(Arc::new(
            YahooChartSource::new(Arc::clone(&http_client)).with_timeout_ms(timeout_ms),
        ));
        if let Some(key) = fred_api_key.filter(|key| !key.trim().is_empty()) {
            sources = sources.with_source(Arc::new(
                FredSource::new(http_client, key).with_timeout_ms(timeout_ms),
            ));
        }
        sources
    }

    /// Register `source` under its own provider id, replacing any previous one.
    pub fn with_source(mut self, source: Arc<dyn SeriesSource>) -> Self {
        self.sources.insert(source.id(), source);
        self
    }

    pub fn get(&self, provider: ProviderId) -> Option<&dyn SeriesSource> {
        self.sources.get(&provider).map(|source| source.as_ref())
    }

    pub fn is_configured(&self, provider: ProviderId) -> bool {
        self.sources.contains_key(&provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpRequest, HttpResponse};
    use std::future::Future;
    use std::pin::Pin;

    struct OfflineClient;

    impl HttpClient for OfflineClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            Box::pin(async { Err(HttpError::new("offline")) })
        }
    }

    #[test]
    fn fred_requires_a_non_blank_key() {
        let client: Arc<dyn HttpClient> = Arc::new(OfflineClient);
        let without = SourceSet::standard(Arc::clone(&client), Some("  "), 1_000);
        assert!(without.is_configured(ProviderId::Yahoo));
        assert!(!without.is_configured(ProviderId::Fred));

        let with = SourceSet::standard(client, Some("abc"), 1_000);
        assert!(with.get(ProviderId::Fred).is_some());
    }
}

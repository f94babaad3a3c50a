//! Metric collectors.
//!
//! One [`Collector`] drives every family: pick the provider adapter, walk the
//! candidate identifiers until one returns data, normalize each day, and
//! upsert one sample per metric. Per-day problems are logged and skipped;
//! only a missing adapter or an exhausted candidate list fails the run.

pub mod fallback;
pub mod gap;
pub mod sources;

use std::time::Instant;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::data_source::{FieldError, FieldValue, SeriesField, SeriesPoint};
use crate::domain::{DataType, DateWindow, MetricSample, ResultStatus, TimestampNormalizer};
use crate::family::{MetricFamily, Transform};
use crate::store::{MetricStore, RunLogEntry, StoreError};
use crate::ProviderId;

pub use fallback::{fetch_first_non_empty, AttemptOutcome, FetchAttempt, FetchedSeries};
pub use gap::{overnight_gaps, GapStep, OvernightGap, PriceDay};
pub use sources::SourceSet;

/// Run-level failures. Nothing is stored when either occurs.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(
        "No data retrieved from {} for any candidate ({})",
        .provider.display_name(),
        describe_attempts(.attempts)
    )]
    ProviderUnavailable {
        provider: ProviderId,
        attempts: Vec<FetchAttempt>,
    },
    #[error("{} is not configured: {hint}", .provider.display_name())]
    ConfigMissing {
        provider: ProviderId,
        hint: &'static str,
    },
}

/// Per-day failures. The day is skipped and the run continues.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Malformed(#[from] FieldError),
    #[error("failed to store {metric}: {source}")]
    Store {
        metric: String,
        #[source]
        source: StoreError,
    },
}

fn describe_attempts(attempts: &[FetchAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything a run needs besides adapters and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorSettings {
    pub window: DateWindow,
    pub normalizer: TimestampNormalizer,
    pub data_type: DataType,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            window: DateWindow::default_collection(),
            normalizer: TimestampNormalizer::default(),
            data_type: DataType::Eod,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionDetails {
    pub family: MetricFamily,
    pub identifier_used: Option<String>,
    pub source: Option<String>,
    pub records_processed: usize,
    pub fetched_entries: usize,
    pub skipped_sentinel: usize,
    pub failed_entries: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub run_id: Uuid,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<String>,
}

/// Caller-facing outcome of one collector run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionResult {
    pub status: ResultStatus,
    pub message: String,
    /// Omitted for configuration errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CollectionDetails>,
}

impl CollectionResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn records_processed(&self) -> usize {
        self.details
            .as_ref()
            .map_or(0, |details| details.records_processed)
    }

    pub fn source_used(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|details| details.source.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RunSummary {
    identifier: String,
    source: String,
    fetched_entries: usize,
    records_processed: usize,
    skipped_sentinel: usize,
    failed_entries: usize,
    passed_over: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyResult {
    pub family: MetricFamily,
    #[serde(flatten)]
    pub result: CollectionResult,
}

/// Outcome of running every family once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub status: ResultStatus,
    pub message: String,
    pub succeeded: usize,
    pub total: usize,
    pub results: Vec<FamilyResult>,
}

pub struct Collector<'a> {
    sources: &'a SourceSet,
    store: &'a dyn MetricStore,
    settings: CollectorSettings,
}

impl<'a> Collector<'a> {
    pub fn new(
        sources: &'a SourceSet,
        store: &'a dyn MetricStore,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            sources,
            store,
            settings,
        }
    }

    pub const fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// Run one family. Never panics and never returns an error; failures are
    /// reported in the result.
    pub async fn collect(&self, family: MetricFamily) -> CollectionResult {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("collect", family = %family, %run_id);
        self.collect_run(family, run_id).instrument(span).await
    }

    async fn collect_run(&self, family: MetricFamily, run_id: Uuid) -> CollectionResult {
        let started = Instant::now();
        let outcome = self.run(family).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(summary) => {
                tracing::info!(
                    source = %summary.source,
                    records = summary.records_processed,
                    skipped = summary.skipped_sentinel,
                    failed = summary.failed_entries,
                    latency_ms,
                    "collection finished"
                );
                self.success(family, run_id, latency_ms, summary)
            }
            Err(error) => {
                tracing::error!(%error, latency_ms, "collection failed");
                self.failure(family, run_id, latency_ms, &error)
            }
        };

        self.log_run(family, run_id, latency_ms, &result);
        result
    }

    /// Run every family in order. One family failing does not stop the rest.
    pub async fn collect_all(&self) -> BatchReport {
        let mut results = Vec::with_capacity(MetricFamily::ALL.len());
        for family in MetricFamily::ALL {
            let result = self.collect(family).await;
            results.push(FamilyResult { family, result });
        }

        let total = results.len();
        let succeeded = results.iter().filter(|entry| entry.result.is_success()).count();
        let status = if succeeded > 0 {
            ResultStatus::Success
        } else {
            ResultStatus::Error
        };
        tracing::info!(succeeded, total, "batch collection finished");

        BatchReport {
            status,
            message: format!("Data collection completed: {succeeded}/{total} collectors succeeded"),
            succeeded,
            total,
            results,
        }
    }

    async fn run(&self, family: MetricFamily) -> Result<RunSummary, CollectError> {
        let provider = family.provider();
        let source = self
            .sources
            .get(provider)
            .ok_or(CollectError::ConfigMissing {
                provider,
                hint: config_hint(provider),
            })?;

        let fetched = fetch_first_non_empty(source, family.candidates(), &self.settings.window)
            .await
            .map_err(|attempts| CollectError::ProviderUnavailable { provider, attempts })?;

        let mut summary = RunSummary {
            source: provider.provenance(&fetched.identifier),
            identifier: fetched.identifier,
            fetched_entries: fetched.points.len(),
            passed_over: fetched.passed_over.iter().map(ToString::to_string).collect(),
            ..RunSummary::default()
        };

        let mut entries: Vec<(DateTime<Tz>, &SeriesPoint)> =
            Vec::with_capacity(fetched.points.len());
        for point in &fetched.points {
            match &point.timestamp {
                Ok(raw) => entries.push((self.settings.normalizer.normalize_daily(*raw), point)),
                Err(error) => {
                    summary.failed_entries += 1;
                    tracing::warn!(%error, "skipping entry");
                }
            }
        }
        entries.sort_by_key(|(timestamp, _)| *timestamp);

        match family.transform() {
            Transform::Field { field, metric, .. } => {
                self.store_field(&entries, field, metric, &mut summary);
            }
            Transform::OvernightGap { points, percent } => {
                self.store_gaps(&entries, points, percent, &mut summary);
            }
        }

        Ok(summary)
    }

    fn store_field(
        &self,
        entries: &[(DateTime<Tz>, &SeriesPoint)],
        field: SeriesField,
        metric: &str,
        summary: &mut RunSummary,
    ) {
        for (timestamp, point) in entries {
            let date = timestamp.date_naive();
            let outcome = point
                .field(field)
                .map_err(EntryError::from)
                .and_then(|value| match value {
                    FieldValue::Observed(value) => self
                        .upsert(*timestamp, metric, Some(value), &summary.source)
                        .map(|()| true),
                    FieldValue::Missing => Ok(false),
                });

            match outcome {
                Ok(true) => summary.records_processed += 1,
                Ok(false) => {
                    summary.skipped_sentinel += 1;
                    tracing::info!(%date, metric, "no observation for day, skipping");
                }
                Err(error) => {
                    summary.failed_entries += 1;
                    tracing::warn!(%date, metric, %error, "skipping entry");
                }
            }
        }
    }

    fn store_gaps(
        &self,
        entries: &[(DateTime<Tz>, &SeriesPoint)],
        points_metric: &str,
        percent_metric: &str,
        summary: &mut RunSummary,
    ) {
        let mut opens = Vec::with_capacity(entries.len());
        let mut days = Vec::with_capacity(entries.len());
        for (timestamp, point) in entries {
            let open = point.field(SeriesField::Open);
            let close = point.field(SeriesField::Close);
            if let Err(error) = &close {
                tracing::warn!(
                    date = %timestamp.date_naive(),
                    %error,
                    "close unusable, carrying previous close"
                );
            }
            days.push(PriceDay {
                timestamp: *timestamp,
                open: open.clone().ok().and_then(FieldValue::observed),
                close: close.ok().and_then(FieldValue::observed),
            });
            opens.push(open);
        }

        for (step, open) in overnight_gaps(&days).into_iter().zip(opens) {
            match step {
                GapStep::Seed { timestamp } => {
                    tracing::debug!(date = %timestamp.date_naive(), "no previous close yet");
                }
                GapStep::MissingOpen { timestamp } => {
                    let date = timestamp.date_naive();
                    match open {
                        Err(error) => {
                            summary.failed_entries += 1;
                            tracing::warn!(%date, %error, "skipping gap entry");
                        }
                        Ok(_) => {
                            summary.skipped_sentinel += 1;
                            tracing::info!(%date, "no opening price for day, skipping gap");
                        }
                    }
                }
                GapStep::Gap(gap) => {
                    let source = summary.source.as_str();
                    let points_written =
                        self.upsert(gap.timestamp, points_metric, Some(gap.points), source);
                    let percent_written =
                        self.upsert(gap.timestamp, percent_metric, gap.percent, source);
                    match (points_written, percent_written) {
                        (Ok(()), Ok(())) => summary.records_processed += 1,
                        (points_written, percent_written) => {
                            summary.failed_entries += 1;
                            let date = gap.timestamp.date_naive();
                            let errors = [points_written.err(), percent_written.err()];
                            for error in errors.into_iter().flatten() {
                                tracing::warn!(%date, %error, "gap not fully stored");
                            }
                        }
                    }
                }
            }
        }
    }

    fn upsert(
        &self,
        timestamp: DateTime<Tz>,
        metric: &str,
        value: Option<f64>,
        source: &str,
    ) -> Result<(), EntryError> {
        let sample = MetricSample::new(timestamp, metric, value, source)
            .with_data_type(self.settings.data_type);
        self.store.upsert(&sample).map_err(|source| EntryError::Store {
            metric: metric.to_owned(),
            source,
        })?;
        tracing::trace!(date = %sample.trade_date(), metric, ?value, "sample upserted");
        Ok(())
    }

    fn success(
        &self,
        family: MetricFamily,
        run_id: Uuid,
        latency_ms: u64,
        summary: RunSummary,
    ) -> CollectionResult {
        let window = &self.settings.window;
        CollectionResult {
            status: ResultStatus::Success,
            message: format!(
                "Collected {} {} from {} between {} and {}",
                summary.records_processed,
                family.label(),
                summary.source,
                window.start(),
                window.end()
            ),
            details: Some(CollectionDetails {
                family,
                identifier_used: Some(summary.identifier),
                source: Some(summary.source),
                records_processed: summary.records_processed,
                fetched_entries: summary.fetched_entries,
                skipped_sentinel: summary.skipped_sentinel,
                failed_entries: summary.failed_entries,
                window_start: window.start(),
                window_end: window.end(),
                run_id,
                latency_ms,
                attempts: summary.passed_over,
            }),
        }
    }

    fn failure(
        &self,
        family: MetricFamily,
        run_id: Uuid,
        latency_ms: u64,
        error: &CollectError,
    ) -> CollectionResult {
        let details = match error {
            CollectError::ConfigMissing { .. } => None,
            CollectError::ProviderUnavailable { attempts, .. } => Some(CollectionDetails {
                family,
                identifier_used: None,
                source: None,
                records_processed: 0,
                fetched_entries: 0,
                skipped_sentinel: 0,
                failed_entries: 0,
                window_start: self.settings.window.start(),
                window_end: self.settings.window.end(),
                run_id,
                latency_ms,
                attempts: attempts.iter().map(ToString::to_string).collect(),
            }),
        };
        CollectionResult {
            status: ResultStatus::Error,
            message: error.to_string(),
            details,
        }
    }

    fn log_run(
        &self,
        family: MetricFamily,
        run_id: Uuid,
        latency_ms: u64,
        result: &CollectionResult,
    ) {
        let entry = RunLogEntry {
            run_id,
            family,
            source: result.source_used().map(str::to_owned),
            status: result.status,
            records_processed: result.records_processed(),
            latency_ms,
        };
        if let Err(error) = self.store.record_run(&entry) {
            tracing::warn!(%family, %run_id, %error, "failed to append run log");
        }
    }
}

const fn config_hint(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Fred => "set PULSETICK_FRED_API_KEY or FRED_API_KEY",
        ProviderId::Yahoo => "no Yahoo Finance adapter registered",
    }
}

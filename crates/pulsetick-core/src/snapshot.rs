//! Daily rollup of every metric stored for one trade date.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::domain::{format_timestamp, MetricSample, ResultStatus, TimestampNormalizer, ALL_METRICS};
use crate::store::{MetricStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_timestamp")]
    pub snapshot_time: DateTime<Tz>,
    pub metrics: BTreeMap<String, Option<f64>>,
    /// Every known metric is present for the date.
    pub is_complete: bool,
}

impl DailySnapshot {
    /// Known metrics with no stored row for the date.
    pub fn missing_metrics(&self) -> Vec<&'static str> {
        ALL_METRICS
            .into_iter()
            .filter(|name| !self.metrics.contains_key(*name))
            .collect()
    }
}

/// Build the rollup from samples already read for `date`.
///
/// Samples from other dates are ignored. A stored null still counts as
/// present.
pub fn rollup(
    date: NaiveDate,
    samples: &[MetricSample],
    snapshot_time: DateTime<Tz>,
) -> DailySnapshot {
    let metrics: BTreeMap<String, Option<f64>> = samples
        .iter()
        .filter(|sample| sample.trade_date() == date)
        .map(|sample| (sample.metric_name.clone(), sample.metric_value))
        .collect();
    let is_complete = ALL_METRICS.iter().all(|name| metrics.contains_key(*name));
    DailySnapshot {
        date,
        snapshot_time,
        metrics,
        is_complete,
    }
}

/// Read `date`, roll it up, and store the snapshot.
pub fn build_daily_snapshot(
    store: &dyn MetricStore,
    normalizer: &TimestampNormalizer,
    date: NaiveDate,
    snapshot_time: DateTime<Tz>,
) -> Result<DailySnapshot, StoreError> {
    let samples = store.samples_on(date, normalizer)?;
    let snapshot = rollup(date, &samples, snapshot_time);
    store.save_snapshot(&snapshot)?;
    tracing::info!(
        %date,
        metrics = snapshot.metrics.len(),
        complete = snapshot.is_complete,
        "daily snapshot stored"
    );
    Ok(snapshot)
}

/// Caller-facing snapshot payload.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DailySnapshot>,
}

impl SnapshotResponse {
    pub fn from_result(result: Result<DailySnapshot, StoreError>) -> Self {
        match result {
            Ok(snapshot) => Self {
                status: ResultStatus::Success,
                message: None,
                data: Some(snapshot),
            },
            Err(error) => Self {
                status: ResultStatus::Error,
                message: Some(format!("Failed to build daily snapshot: {error}")),
                data: None,
            },
        }
    }
}

fn serialize_timestamp<S: Serializer>(
    value: &DateTime<Tz>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(value))
}

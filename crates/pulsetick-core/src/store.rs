//! Storage seam between collectors/readers and the warehouse.
//!
//! [`MetricStore`] is implemented for [`Warehouse`] and for [`MemoryStore`],
//! an in-process store used by tests and `--dry-run` collection.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use pulsetick_warehouse::{
    DailySnapshotRecord, MetricRecord, RunLogRecord, Warehouse, WarehouseError,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    format_timestamp, DataType, DateWindow, MetricSample, ResultStatus, TimestampNormalizer,
};
use crate::snapshot::DailySnapshot;
use crate::MetricFamily;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error("stored row is unreadable: {0}")]
    Corrupt(String),
    #[error("failed to encode snapshot metrics: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// One audit row per collector run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogEntry {
    pub run_id: Uuid,
    pub family: MetricFamily,
    pub source: Option<String>,
    pub status: ResultStatus,
    pub records_processed: usize,
    pub latency_ms: u64,
}

pub trait MetricStore {
    /// Insert or overwrite the sample keyed by `(timestamp, metric_name)`.
    fn upsert(&self, sample: &MetricSample) -> Result<(), StoreError>;

    /// Samples for any of `metric_names` whose trade date is in
    /// `[window.start, window.end)`, ascending by timestamp.
    fn query(
        &self,
        metric_names: &[&str],
        window: &DateWindow,
        normalizer: &TimestampNormalizer,
    ) -> Result<Vec<MetricSample>, StoreError>;

    /// Every sample stored for one trade date.
    fn samples_on(
        &self,
        date: NaiveDate,
        normalizer: &TimestampNormalizer,
    ) -> Result<Vec<MetricSample>, StoreError>;

    fn record_run(&self, entry: &RunLogEntry) -> Result<(), StoreError>;

    fn save_snapshot(&self, snapshot: &DailySnapshot) -> Result<(), StoreError>;
}

impl MetricStore for Warehouse {
    fn upsert(&self, sample: &MetricSample) -> Result<(), StoreError> {
        self.upsert_metric(&MetricRecord {
            ts: format_timestamp(&sample.timestamp),
            trade_date: sample.trade_date().to_string(),
            metric_name: sample.metric_name.clone(),
            metric_value: sample.metric_value,
            data_type: sample.data_type.as_str().to_owned(),
            source: Some(sample.source.clone()),
        })?;
        Ok(())
    }

    fn query(
        &self,
        metric_names: &[&str],
        window: &DateWindow,
        normalizer: &TimestampNormalizer,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let start = window.start().to_string();
        let end = window.end().to_string();
        self.query_metrics(metric_names, &start, &end)?
            .into_iter()
            .map(|record| sample_from_record(record, normalizer))
            .collect()
    }

    fn samples_on(
        &self,
        date: NaiveDate,
        normalizer: &TimestampNormalizer,
    ) -> Result<Vec<MetricSample>, StoreError> {
        self.metrics_for_date(&date.to_string())?
            .into_iter()
            .map(|record| sample_from_record(record, normalizer))
            .collect()
    }

    fn record_run(&self, entry: &RunLogEntry) -> Result<(), StoreError> {
        Warehouse::record_run(
            self,
            &RunLogRecord {
                run_id: entry.run_id.to_string(),
                family: entry.family.as_str().to_owned(),
                source: entry.source.clone(),
                status: entry.status.as_str().to_owned(),
                records_processed: i64::try_from(entry.records_processed).unwrap_or(i64::MAX),
                latency_ms: entry.latency_ms,
            },
        )?;
        Ok(())
    }

    fn save_snapshot(&self, snapshot: &DailySnapshot) -> Result<(), StoreError> {
        self.upsert_daily_snapshot(&DailySnapshotRecord {
            date: snapshot.date.to_string(),
            snapshot_time: format_timestamp(&snapshot.snapshot_time),
            metrics: serde_json::to_string(&snapshot.metrics)?,
            is_complete: snapshot.is_complete,
        })?;
        Ok(())
    }
}

fn sample_from_record(
    record: MetricRecord,
    normalizer: &TimestampNormalizer,
) -> Result<MetricSample, StoreError> {
    let timestamp = normalizer
        .parse_stored(&record.ts)
        .map_err(|error| StoreError::Corrupt(error.to_string()))?;
    let data_type = record
        .data_type
        .parse::<DataType>()
        .map_err(|error| StoreError::Corrupt(error.to_string()))?;
    Ok(MetricSample {
        timestamp,
        metric_name: record.metric_name,
        metric_value: record.metric_value,
        data_type,
        source: record.source.unwrap_or_default(),
    })
}

/// In-process [`MetricStore`] with write-failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    samples: BTreeMap<(String, String), MetricSample>,
    runs: Vec<RunLogEntry>,
    snapshots: BTreeMap<NaiveDate, DailySnapshot>,
    failing_writes: Vec<(NaiveDate, String)>,
    failing_reads: bool,
    upsert_calls: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every future write of `metric_name` on `date`.
    pub fn fail_writes_for(&self, date: NaiveDate, metric_name: &str) {
        self.lock()
            .failing_writes
            .push((date, metric_name.to_owned()));
    }

    /// Make every query fail.
    pub fn fail_reads(&self) {
        self.lock().failing_reads = true;
    }

    /// All stored samples ordered by timestamp text then metric name.
    pub fn samples(&self) -> Vec<MetricSample> {
        self.lock().samples.values().cloned().collect()
    }

    pub fn runs(&self) -> Vec<RunLogEntry> {
        self.lock().runs.clone()
    }

    pub fn snapshot(&self, date: NaiveDate) -> Option<DailySnapshot> {
        self.lock().snapshots.get(&date).cloned()
    }

    /// Number of successful upserts, overwrites included.
    pub fn upsert_calls(&self) -> usize {
        self.lock().upsert_calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_guard(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        let state = self.lock();
        if state.failing_reads {
            return Err(StoreError::Rejected(String::from("reads are disabled")));
        }
        Ok(state)
    }
}

impl MetricStore for MemoryStore {
    fn upsert(&self, sample: &MetricSample) -> Result<(), StoreError> {
        let mut state = self.lock();
        let date = sample.trade_date();
        if state
            .failing_writes
            .iter()
            .any(|(failing_date, name)| *failing_date == date && *name == sample.metric_name)
        {
            return Err(StoreError::Rejected(format!(
                "{} on {date}",
                sample.metric_name
            )));
        }
        let key = (format_timestamp(&sample.timestamp), sample.metric_name.clone());
        state.samples.insert(key, sample.clone());
        state.upsert_calls += 1;
        Ok(())
    }

    fn query(
        &self,
        metric_names: &[&str],
        window: &DateWindow,
        normalizer: &TimestampNormalizer,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let state = self.read_guard()?;
        let mut rows: Vec<MetricSample> = state
            .samples
            .values()
            .filter(|sample| metric_names.contains(&sample.metric_name.as_str()))
            .filter(|sample| window.contains_half_open(sample.trade_date()))
            .map(|sample| rezone(sample, normalizer))
            .collect();
        rows.sort_by(|left, right| {
            left.timestamp
                .cmp(&right.timestamp)
                .then_with(|| left.metric_name.cmp(&right.metric_name))
        });
        Ok(rows)
    }

    fn samples_on(
        &self,
        date: NaiveDate,
        normalizer: &TimestampNormalizer,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let state = self.read_guard()?;
        let mut rows: Vec<MetricSample> = state
            .samples
            .values()
            .filter(|sample| sample.trade_date() == date)
            .map(|sample| rezone(sample, normalizer))
            .collect();
        rows.sort_by(|left, right| left.metric_name.cmp(&right.metric_name));
        Ok(rows)
    }

    fn record_run(&self, entry: &RunLogEntry) -> Result<(), StoreError> {
        self.lock().runs.push(entry.clone());
        Ok(())
    }

    fn save_snapshot(&self, snapshot: &DailySnapshot) -> Result<(), StoreError> {
        self.lock()
            .snapshots
            .insert(snapshot.date, snapshot.clone());
        Ok(())
    }
}

fn rezone(sample: &MetricSample, normalizer: &TimestampNormalizer) -> MetricSample {
    MetricSample {
        timestamp: sample.timestamp.with_timezone(&normalizer.zone()),
        ..sample.clone()
    }
}

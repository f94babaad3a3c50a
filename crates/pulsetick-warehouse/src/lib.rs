//! # Pulsetick Warehouse
//!
//! DuckDB-backed storage for daily market metrics.
//!
//! ## Overview
//!
//! The warehouse owns three tables:
//!
//! | Table | Description |
//! |-------|-------------|
//! | `market_metrics` | One row per `(ts, metric_name)`, overwritten on re-collection |
//! | `daily_snapshots` | One JSON rollup row per calendar date |
//! | `collection_runs` | Audit log, one row per collector run |
//!
//! All values are bound as statement parameters; nothing caller-provided is
//! interpolated into SQL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulsetick_warehouse::{MetricRecord, Warehouse};
//!
//! fn main() -> Result<(), pulsetick_warehouse::WarehouseError> {
//!     let warehouse = Warehouse::open_default()?;
//!     warehouse.upsert_metric(&MetricRecord {
//!         ts: "2024-01-02T00:00:00-05:00".to_string(),
//!         trade_date: "2024-01-02".to_string(),
//!         metric_name: "vix_level".to_string(),
//!         metric_value: Some(13.2),
//!         data_type: "eod".to_string(),
//!         source: Some("Yahoo Finance (^VIX)".to_string()),
//!     })?;
//!
//!     let rows = warehouse.query_metrics(&["vix_level"], "2024-01-01", "2024-02-01")?;
//!     println!("{} rows", rows.len());
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, ToSql};
use serde::Serialize;
use thiserror::Error;

pub use connection::SharedConnection;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error while preparing the database directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A record was rejected before reaching the database.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for pulsetick data.
    pub pulsetick_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl WarehouseConfig {
    /// Derive the database location from a home directory.
    pub fn for_home(pulsetick_home: impl Into<PathBuf>) -> Self {
        let pulsetick_home = pulsetick_home.into();
        let db_path = pulsetick_home.join("cache").join("warehouse.duckdb");
        Self {
            pulsetick_home,
            db_path,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::for_home(resolve_pulsetick_home())
    }
}

/// A stored metric row.
///
/// `ts` is an RFC3339 timestamp carrying the reference-zone offset and
/// `trade_date` is its local `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub ts: String,
    pub trade_date: String,
    pub metric_name: String,
    pub metric_value: Option<f64>,
    pub data_type: String,
    pub source: Option<String>,
}

impl MetricRecord {
    fn validate(&self) -> Result<(), WarehouseError> {
        if self.ts.trim().is_empty() {
            return Err(WarehouseError::InvalidRecord(String::from(
                "timestamp must not be empty",
            )));
        }
        if self.metric_name.trim().is_empty() {
            return Err(WarehouseError::InvalidRecord(String::from(
                "metric_name must not be empty",
            )));
        }
        if self.metric_value.is_some_and(|value| !value.is_finite()) {
            return Err(WarehouseError::InvalidRecord(format!(
                "metric '{}' value must be finite",
                self.metric_name
            )));
        }
        Ok(())
    }
}

/// One materialized daily rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshotRecord {
    pub date: String,
    pub snapshot_time: String,
    /// JSON object text, `{metric_name: value}`.
    pub metrics: String,
    pub is_complete: bool,
}

/// Audit entry written after each collector run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogRecord {
    pub run_id: String,
    pub family: String,
    pub source: Option<String>,
    pub status: String,
    pub records_processed: i64,
    pub latency_ms: u64,
}

/// The main warehouse interface for metric storage.
#[derive(Clone)]
pub struct Warehouse {
    connection: SharedConnection,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let warehouse = Self {
            connection: SharedConnection::open(config.db_path)?,
        };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Open a warehouse that lives only as long as the returned handle.
    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let warehouse = Self {
            connection: SharedConnection::open_in_memory()?,
        };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Create tables and indexes if needed.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.connection.lock();
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Path to the database file, `None` when in-memory.
    pub fn db_path(&self) -> Option<&Path> {
        self.connection.db_path()
    }

    /// Insert a metric row or overwrite the value, type, and source of the
    /// existing row with the same `(ts, metric_name)`.
    ///
    /// `created_at` is preserved across overwrites.
    pub fn upsert_metric(&self, record: &MetricRecord) -> Result<(), WarehouseError> {
        record.validate()?;

        let connection = self.connection.lock();
        let params: [&dyn ToSql; 6] = [
            &record.ts,
            &record.metric_name,
            &record.trade_date,
            &record.metric_value,
            &record.data_type,
            &record.source,
        ];
        connection.execute(
            "INSERT INTO market_metrics \
             (ts, metric_name, trade_date, metric_value, data_type, source, \
             created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP) \
             ON CONFLICT (ts, metric_name) DO UPDATE SET \
             metric_value = excluded.metric_value, \
             data_type = excluded.data_type, \
             source = excluded.source, \
             updated_at = excluded.updated_at",
            params.as_slice(),
        )?;

        Ok(())
    }

    /// Rows for any of `metric_names` with `start_date <= trade_date < end_date`,
    /// ascending by timestamp.
    pub fn query_metrics(
        &self,
        metric_names: &[&str],
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<MetricRecord>, WarehouseError> {
        if metric_names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; metric_names.len()].join(", ");
        let sql = format!(
            "SELECT ts, trade_date, metric_name, metric_value, data_type, source \
             FROM market_metrics \
             WHERE metric_name IN ({placeholders}) AND trade_date >= ? AND trade_date < ? \
             ORDER BY trade_date, ts, metric_name"
        );

        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(metric_names.len() + 2);
        for name in metric_names {
            params.push(name);
        }
        params.push(&start_date);
        params.push(&end_date);

        let connection = self.connection.lock();
        let mut statement = connection.prepare(sql.as_str())?;
        let rows = statement.query_map(params.as_slice(), |row| {
            Ok(MetricRecord {
                ts: row.get(0)?,
                trade_date: row.get(1)?,
                metric_name: row.get(2)?,
                metric_value: row.get(3)?,
                data_type: row.get(4)?,
                source: row.get(5)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Every row stored for a single trade date, ordered by metric name.
    pub fn metrics_for_date(&self, trade_date: &str) -> Result<Vec<MetricRecord>, WarehouseError> {
        let connection = self.connection.lock();
        let mut statement = connection.prepare(
            "SELECT ts, trade_date, metric_name, metric_value, data_type, source \
             FROM market_metrics WHERE trade_date = ? ORDER BY metric_name",
        )?;
        let rows = statement.query_map(params![trade_date], |row| {
            Ok(MetricRecord {
                ts: row.get(0)?,
                trade_date: row.get(1)?,
                metric_name: row.get(2)?,
                metric_value: row.get(3)?,
                data_type: row.get(4)?,
                source: row.get(5)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Number of stored rows for `metric_name`.
    pub fn count_metric(&self, metric_name: &str) -> Result<i64, WarehouseError> {
        let connection = self.connection.lock();
        let count = connection.query_row(
            "SELECT COUNT(*) FROM market_metrics WHERE metric_name = ?",
            params![metric_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Append one collector run to the audit log.
    pub fn record_run(&self, record: &RunLogRecord) -> Result<(), WarehouseError> {
        let connection = self.connection.lock();
        let params: [&dyn ToSql; 6] = [
            &record.run_id,
            &record.family,
            &record.source,
            &record.status,
            &record.records_processed,
            &record.latency_ms,
        ];
        connection.execute(
            "INSERT INTO collection_runs \
             (run_id, family, source, status, records_processed, latency_ms, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Most recent runs, newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunLogRecord>, WarehouseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let connection = self.connection.lock();
        let mut statement = connection.prepare(
            "SELECT run_id, family, source, status, records_processed, latency_ms \
             FROM collection_runs ORDER BY recorded_at DESC LIMIT ?",
        )?;
        let rows = statement.query_map(params![limit], |row| {
            let latency: Option<i64> = row.get(5)?;
            Ok(RunLogRecord {
                run_id: row.get(0)?,
                family: row.get(1)?,
                source: row.get(2)?,
                status: row.get(3)?,
                records_processed: row.get(4)?,
                latency_ms: latency.and_then(|value| u64::try_from(value).ok()).unwrap_or(0),
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Insert or replace the snapshot for `record.date`.
    pub fn upsert_daily_snapshot(
        &self,
        record: &DailySnapshotRecord,
    ) -> Result<(), WarehouseError> {
        serde_json::from_str::<serde_json::Value>(&record.metrics).map_err(|error| {
            WarehouseError::InvalidRecord(format!("snapshot metrics must be JSON: {error}"))
        })?;

        let connection = self.connection.lock();
        let params: [&dyn ToSql; 4] = [
            &record.date,
            &record.snapshot_time,
            &record.metrics,
            &record.is_complete,
        ];
        connection.execute(
            "INSERT INTO daily_snapshots (date, snapshot_time, metrics, is_complete, created_at) \
             VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP) \
             ON CONFLICT (date) DO UPDATE SET \
             snapshot_time = excluded.snapshot_time, \
             metrics = excluded.metrics, \
             is_complete = excluded.is_complete",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Snapshot stored for `date`, if any.
    pub fn daily_snapshot(
        &self,
        date: &str,
    ) -> Result<Option<DailySnapshotRecord>, WarehouseError> {
        let connection = self.connection.lock();
        let mut statement = connection.prepare(
            "SELECT date, snapshot_time, metrics, is_complete FROM daily_snapshots WHERE date = ?",
        )?;
        let mut rows = statement.query(params![date])?;
        let snapshot = match rows.next()? {
            Some(row) => Some(DailySnapshotRecord {
                date: row.get(0)?,
                snapshot_time: row.get(1)?,
                metrics: row.get(2)?,
                is_complete: row.get(3)?,
            }),
            None => None,
        };
        Ok(snapshot)
    }
}

/// Resolve the pulsetick home directory from environment or default.
fn resolve_pulsetick_home() -> PathBuf {
    if let Some(path) = env::var_os("PULSETICK_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".pulsetick");
    }

    PathBuf::from(".pulsetick")
}

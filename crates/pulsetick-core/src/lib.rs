//! # Pulsetick Core
//!
//! Daily market-metric collection and retrieval.
//!
//! ## Overview
//!
//! - **Timestamp normalization** into one reference zone, so every daily
//!   sample of a trading day lands on the same storage key
//! - **Provider adapters** for Yahoo Finance charts and FRED observations
//! - **Collectors** with candidate fallback, sentinel screening, and the
//!   overnight gap fold
//! - **Series reader** and **daily snapshot** rollup over a [`MetricStore`]
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo and FRED series sources |
//! | [`collector`] | Collector driver, fallback, gap fold |
//! | [`config`] | Environment-backed configuration |
//! | [`data_source`] | `SeriesSource` trait and raw point types |
//! | [`domain`] | Samples, windows, normalizer |
//! | [`family`] | Metric family table |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`reader`] | Caller-facing series reads |
//! | [`snapshot`] | Daily rollup |
//! | [`store`] | Storage seam over the warehouse |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pulsetick_core::{
//!     Collector, MetricFamily, PulsetickConfig, ReqwestHttpClient, SourceSet, Warehouse,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PulsetickConfig::from_env()?;
//!     let warehouse = Warehouse::open_default()?;
//!     let sources = SourceSet::standard(
//!         Arc::new(ReqwestHttpClient::new()),
//!         config.fred_api_key.as_deref(),
//!         config.http_timeout_ms,
//!     );
//!
//!     let collector = Collector::new(&sources, &warehouse, config.collector_settings());
//!     let result = collector.collect(MetricFamily::VixLevel).await;
//!     println!("{}", result.message);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod collector;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod family;
pub mod http_client;
pub mod reader;
pub mod snapshot;
pub mod source;
pub mod store;

pub use adapters::{FredSource, YahooChartSource};

pub use collector::{
    BatchReport, CollectError, CollectionDetails, CollectionResult, Collector, CollectorSettings,
    EntryError, FamilyResult, SourceSet,
};

pub use config::PulsetickConfig;

pub use data_source::{
    FieldError, FieldValue, RawValue, SeriesField, SeriesPoint, SeriesRequest, SeriesSource,
    SourceError, SourceErrorKind,
};

pub use domain::{
    format_timestamp, parse_date, parse_zone, DataType, DateWindow, MetricSample, RawTimestamp,
    ResultStatus, TimestampNormalizer, DEFAULT_REFERENCE_ZONE,
};

pub use error::ValidationError;

pub use family::{MetricFamily, Transform};

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use reader::{GapRecord, ReadRecord, ReadResponse, SeriesReader, SeriesRecord};

pub use snapshot::{build_daily_snapshot, rollup, DailySnapshot, SnapshotResponse};

pub use source::ProviderId;

pub use store::{MemoryStore, MetricStore, RunLogEntry, StoreError};

pub use pulsetick_warehouse::{Warehouse, WarehouseConfig, WarehouseError};

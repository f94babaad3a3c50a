//! Runtime configuration resolved from the environment.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `PULSETICK_HOME` | data directory | `~/.pulsetick` |
//! | `PULSETICK_FRED_API_KEY` / `FRED_API_KEY` | FRED key | unset (treasury yield disabled) |
//! | `PULSETICK_TIMEZONE` | reference zone | `America/New_York` |
//! | `PULSETICK_WINDOW_START` | first collection date | `2024-01-01` |
//! | `PULSETICK_WINDOW_END` | last collection date | `2024-01-31` |
//! | `PULSETICK_HTTP_TIMEOUT_MS` | per-request timeout | `10000` |

use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;

use crate::collector::CollectorSettings;
use crate::domain::{
    parse_date, parse_zone, DataType, DateWindow, TimestampNormalizer, DEFAULT_REFERENCE_ZONE,
};
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulsetickConfig {
    pub home: Option<PathBuf>,
    pub fred_api_key: Option<String>,
    pub reference_zone: Tz,
    pub collection_window: DateWindow,
    pub http_timeout_ms: u64,
}

impl Default for PulsetickConfig {
    fn default() -> Self {
        Self {
            home: None,
            fred_api_key: None,
            reference_zone: DEFAULT_REFERENCE_ZONE,
            collection_window: DateWindow::default_collection(),
            http_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl PulsetickConfig {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let reference_zone = match get("PULSETICK_TIMEZONE") {
            Some(value) => parse_zone(&value)?,
            None => defaults.reference_zone,
        };
        let start = match get("PULSETICK_WINDOW_START") {
            Some(value) => parse_date(&value)?,
            None => defaults.collection_window.start(),
        };
        let end = match get("PULSETICK_WINDOW_END") {
            Some(value) => parse_date(&value)?,
            None => defaults.collection_window.end(),
        };
        let http_timeout_ms = match get("PULSETICK_HTTP_TIMEOUT_MS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|timeout| *timeout > 0)
                .ok_or(ValidationError::InvalidNumber {
                    field: "PULSETICK_HTTP_TIMEOUT_MS",
                    value,
                })?,
            None => defaults.http_timeout_ms,
        };

        Ok(Self {
            home: get("PULSETICK_HOME").map(PathBuf::from),
            fred_api_key: get("PULSETICK_FRED_API_KEY").or_else(|| get("FRED_API_KEY")),
            reference_zone,
            collection_window: DateWindow::new(start, end)?,
            http_timeout_ms,
        })
    }

    pub fn normalizer(&self) -> TimestampNormalizer {
        TimestampNormalizer::new(self.reference_zone)
    }

    /// Read window covering every day of the collection window.
    pub fn read_window(&self) -> DateWindow {
        self.collection_window.through_end()
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            window: self.collection_window,
            normalizer: self.normalizer(),
            data_type: DataType::Eod,
        }
    }
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const NQ_CLOSE: &str = "nq_close";
pub const VIX_LEVEL: &str = "vix_level";
pub const TREASURY_10Y_YIELD: &str = "treasury_10y_yield";
pub const OVERNIGHT_GAP_POINTS: &str = "overnight_gap_points";
pub const OVERNIGHT_GAP_PERCENT: &str = "overnight_gap_percent";
pub const PUT_CALL_RATIO: &str = "put_call_ratio";

/// Every metric name a collector can write.
pub const ALL_METRICS: [&str; 6] = [
    NQ_CLOSE,
    VIX_LEVEL,
    TREASURY_10Y_YIELD,
    OVERNIGHT_GAP_POINTS,
    OVERNIGHT_GAP_PERCENT,
    PUT_CALL_RATIO,
];

/// Granularity tag stored alongside every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Eod,
    Premarket,
}

impl DataType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eod => "eod",
            Self::Premarket => "premarket",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eod" => Ok(Self::Eod),
            "premarket" => Ok(Self::Premarket),
            other => Err(ValidationError::InvalidDataType {
                value: other.to_owned(),
            }),
        }
    }
}

/// One stored observation of one metric at one normalized timestamp.
///
/// `(timestamp, metric_name)` is the storage key; writing a sample with an
/// existing key replaces the stored value and source.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub timestamp: DateTime<Tz>,
    pub metric_name: String,
    /// `None` is a legitimate stored null, e.g. a gap percentage whose
    /// previous close was zero.
    pub metric_value: Option<f64>,
    pub data_type: DataType,
    pub source: String,
}

impl MetricSample {
    pub fn new(
        timestamp: DateTime<Tz>,
        metric_name: impl Into<String>,
        metric_value: Option<f64>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            metric_name: metric_name.into(),
            metric_value,
            data_type: DataType::Eod,
            source: source.into(),
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Calendar date of the sample in the reference zone.
    pub fn trade_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Inclusive-start date range.
///
/// Collection passes both ends to the provider (Yahoo treats `end` as
/// exclusive, FRED as inclusive). Reads treat the window as `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Default collection window, January 2024.
    pub fn default_collection() -> Self {
        Self {
            start: ymd(2024, 1, 1),
            end: ymd(2024, 1, 31),
        }
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Half-open read window covering every day of this window, end included.
    pub fn through_end(&self) -> Self {
        Self {
            start: self.start,
            end: self.end.checked_add_days(Days::new(1)).unwrap_or(self.end),
        }
    }

    /// `true` when `date` falls in `[start, end)`.
    pub fn contains_half_open(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

impl Display for DateWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        value: value.to_owned(),
    })
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

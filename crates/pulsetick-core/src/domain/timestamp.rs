use std::str::FromStr;

use chrono::offset::LocalResult;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat, TimeDelta,
    TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::ValidationError;

/// Market reference zone used when nothing else is configured.
pub const DEFAULT_REFERENCE_ZONE: Tz = chrono_tz::America::New_York;

/// A provider timestamp before normalization.
///
/// Zone-less wall-clock values are interpreted as UTC. Bare calendar dates
/// name a trading day directly and never pass through UTC, so a date cannot
/// slide onto the previous day in zones west of Greenwich.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl RawTimestamp {
    /// Parse RFC3339, `YYYY-MM-DD[T ]HH:MM:SS`, or `YYYY-MM-DD`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let value = input.trim();
        if let Ok(aware) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self::Aware(aware));
        }
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(Self::Naive(naive));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(Self::Date(date));
        }
        Err(ValidationError::InvalidTimestamp {
            value: input.to_owned(),
        })
    }

    /// Unix seconds as reported by chart endpoints.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(seconds, 0).map(Self::from)
    }
}

impl FromStr for RawTimestamp {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl From<NaiveDateTime> for RawTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl From<NaiveDate> for RawTimestamp {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<FixedOffset>> for RawTimestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Aware(value)
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Aware(value.fixed_offset())
    }
}

impl From<DateTime<Tz>> for RawTimestamp {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Aware(value.fixed_offset())
    }
}

/// Converts provider timestamps into the canonical reference-zone form.
///
/// The canonical form is the reference-zone wall-clock time of the instant,
/// re-attached to the zone. Normalizing an already-normalized value returns
/// it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampNormalizer {
    zone: Tz,
}

impl TimestampNormalizer {
    pub const fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub const fn zone(&self) -> Tz {
        self.zone
    }

    pub fn normalize(&self, raw: RawTimestamp) -> DateTime<Tz> {
        let wall_clock = match raw {
            RawTimestamp::Aware(value) => value.with_timezone(&self.zone).naive_local(),
            RawTimestamp::Naive(value) => Utc
                .from_utc_datetime(&value)
                .with_timezone(&self.zone)
                .naive_local(),
            RawTimestamp::Date(date) => date.and_time(NaiveTime::MIN),
        };
        self.attach(wall_clock)
    }

    /// Normalize, then truncate to local midnight of the trading day.
    ///
    /// Every daily sample is keyed on this value so that re-collecting the
    /// same day always hits the same storage key.
    pub fn normalize_daily(&self, raw: RawTimestamp) -> DateTime<Tz> {
        let trading_day = self.normalize(raw).date_naive();
        self.attach(trading_day.and_time(NaiveTime::MIN))
    }

    /// Midnight of `date` in the reference zone.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Tz> {
        self.attach(date.and_time(NaiveTime::MIN))
    }

    /// Read back a stored RFC3339 timestamp into the reference zone.
    pub fn parse_stored(&self, value: &str) -> Result<DateTime<Tz>, ValidationError> {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&self.zone))
            .map_err(|_| ValidationError::InvalidTimestamp {
                value: value.to_owned(),
            })
    }

    // Ambiguous wall-clock times (DST fall-back) take the earlier offset.
    // Times skipped by a spring-forward gap (zones that jump over midnight)
    // resolve to the first instant after the gap, on the same local date.
    fn attach(&self, wall_clock: NaiveDateTime) -> DateTime<Tz> {
        match self.zone.from_local_datetime(&wall_clock) {
            LocalResult::Single(value) => value,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                let offset_before_gap = self
                    .zone
                    .from_utc_datetime(&(wall_clock - TimeDelta::days(1)))
                    .offset()
                    .fix();
                self.zone.from_utc_datetime(&(wall_clock - offset_before_gap))
            }
        }
    }
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_ZONE)
    }
}

/// RFC3339 rendering with the zone offset, the form stored in the warehouse.
pub fn format_timestamp(value: &DateTime<Tz>) -> String {
    value
        .fixed_offset()
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse an IANA zone name such as `America/New_York`.
pub fn parse_zone(value: &str) -> Result<Tz, ValidationError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone {
            value: value.to_owned(),
        })
}

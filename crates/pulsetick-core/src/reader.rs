//! Series reader: stored samples reshaped into caller-facing records.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::domain::{format_timestamp, DateWindow, MetricSample, ResultStatus, TimestampNormalizer};
use crate::family::{MetricFamily, Transform};
use crate::store::{MetricStore, StoreError};

/// One stored value under its family-specific field name.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord {
    pub date: NaiveDate,
    pub timestamp: DateTime<Tz>,
    pub field: &'static str,
    pub value: Option<f64>,
    pub source: String,
}

impl Serialize for SeriesRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("date", &self.date)?;
        map.serialize_entry("timestamp", &format_timestamp(&self.timestamp))?;
        map.serialize_entry(self.field, &self.value)?;
        map.serialize_entry("source", &self.source)?;
        map.end()
    }
}

/// Both gap metrics for one date. A half that was never stored is absent
/// from the serialized record; a stored null serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapRecord {
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Tz>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_points: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_percent: Option<Option<f64>>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadRecord {
    Series(SeriesRecord),
    Gap(GapRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadResponse {
    Success {
        status: ResultStatus,
        count: usize,
        data: Vec<ReadRecord>,
    },
    Error {
        status: ResultStatus,
        message: String,
    },
}

impl ReadResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn records(&self) -> &[ReadRecord] {
        match self {
            Self::Success { data, .. } => data,
            Self::Error { .. } => &[],
        }
    }
}

pub struct SeriesReader<'a> {
    store: &'a dyn MetricStore,
    normalizer: TimestampNormalizer,
}

impl<'a> SeriesReader<'a> {
    pub fn new(store: &'a dyn MetricStore, normalizer: TimestampNormalizer) -> Self {
        Self { store, normalizer }
    }

    /// Records for `family` with trade dates in `[window.start, window.end)`,
    /// ascending. Store failures become an error payload.
    pub fn read(&self, family: MetricFamily, window: &DateWindow) -> ReadResponse {
        match self.records(family, window) {
            Ok(data) => {
                tracing::debug!(%family, %window, count = data.len(), "series read");
                ReadResponse::Success {
                    status: ResultStatus::Success,
                    count: data.len(),
                    data,
                }
            }
            Err(error) => {
                tracing::error!(%family, %window, %error, "series read failed");
                ReadResponse::Error {
                    status: ResultStatus::Error,
                    message: format!("Failed to read {}: {error}", family.label()),
                }
            }
        }
    }

    pub fn records(
        &self,
        family: MetricFamily,
        window: &DateWindow,
    ) -> Result<Vec<ReadRecord>, StoreError> {
        let samples = self
            .store
            .query(family.metric_names(), window, &self.normalizer)?;

        let records = match family.transform() {
            Transform::Field { reader_field, .. } => samples
                .into_iter()
                .map(|sample| ReadRecord::Series(series_record(sample, reader_field)))
                .collect(),
            Transform::OvernightGap { points, percent } => group_gaps(samples, points, percent)
                .into_iter()
                .map(ReadRecord::Gap)
                .collect(),
        };
        Ok(records)
    }
}

fn series_record(sample: MetricSample, field: &'static str) -> SeriesRecord {
    SeriesRecord {
        date: sample.trade_date(),
        timestamp: sample.timestamp,
        field,
        value: sample.metric_value,
        source: sample.source,
    }
}

fn group_gaps(samples: Vec<MetricSample>, points: &str, percent: &str) -> Vec<GapRecord> {
    let mut by_date: BTreeMap<NaiveDate, GapRecord> = BTreeMap::new();
    for sample in samples {
        let date = sample.trade_date();
        let record = by_date.entry(date).or_insert_with(|| GapRecord {
            date,
            timestamp: sample.timestamp,
            gap_points: None,
            gap_percent: None,
            source: sample.source.clone(),
        });
        if sample.metric_name == points {
            record.gap_points = Some(sample.metric_value);
        } else if sample.metric_name == percent {
            record.gap_percent = Some(sample.metric_value);
        }
    }
    by_date.into_values().collect()
}

fn serialize_timestamp<S: Serializer>(
    value: &DateTime<Tz>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OVERNIGHT_GAP_PERCENT, OVERNIGHT_GAP_POINTS};
    use crate::store::MemoryStore;
    use crate::RawTimestamp;
    use serde_json::json;

    fn sample(day: &str, name: &str, value: Option<f64>) -> MetricSample {
        let timestamp = TimestampNormalizer::default()
            .normalize_daily(RawTimestamp::parse(day).expect("day"));
        MetricSample::new(timestamp, name, value, "Yahoo Finance (NQ=F)")
    }

    fn window() -> DateWindow {
        DateWindow::parse("2024-01-01", "2024-02-01").expect("window")
    }

    #[test]
    fn single_metric_records_use_family_field_name() {
        let store = MemoryStore::new();
        store.upsert(&sample("2024-01-03", "nq_close", Some(16_540.0))).expect("upsert");
        store.upsert(&sample("2024-01-02", "nq_close", Some(16_650.25))).expect("upsert");

        let reader = SeriesReader::new(&store, TimestampNormalizer::default());
        let json =
            serde_json::to_value(reader.read(MetricFamily::NqClose, &window())).expect("json");

        assert_eq!(json["status"], "success");
        assert_eq!(json["count"], 2);
        assert_eq!(
            json["data"][0],
            json!({
                "date": "2024-01-02",
                "timestamp": "2024-01-02T00:00:00-05:00",
                "close_price": 16650.25,
                "source": "Yahoo Finance (NQ=F)"
            })
        );
    }

    #[test]
    fn gap_records_merge_by_date_and_tolerate_missing_half() {
        let store = MemoryStore::new();
        store.upsert(&sample("2024-01-03", OVERNIGHT_GAP_POINTS, Some(6.0))).expect("points");
        store.upsert(&sample("2024-01-03", OVERNIGHT_GAP_PERCENT, Some(6.0))).expect("percent");
        store.upsert(&sample("2024-01-04", OVERNIGHT_GAP_POINTS, Some(-1.0))).expect("points only");

        let reader = SeriesReader::new(&store, TimestampNormalizer::default());
        let json =
            serde_json::to_value(reader.read(MetricFamily::OvernightGap, &window())).expect("json");

        assert_eq!(json["count"], 2);
        assert_eq!(json["data"][0]["gap_points"], 6.0);
        assert_eq!(json["data"][0]["gap_percent"], 6.0);
        assert_eq!(json["data"][1]["gap_points"], -1.0);
        assert!(json["data"][1].get("gap_percent").is_none());
    }

    #[test]
    fn stored_null_percent_serializes_as_null() {
        let store = MemoryStore::new();
        store.upsert(&sample("2024-01-03", OVERNIGHT_GAP_POINTS, Some(2.5))).expect("points");
        store.upsert(&sample("2024-01-03", OVERNIGHT_GAP_PERCENT, None)).expect("percent");

        let reader = SeriesReader::new(&store, TimestampNormalizer::default());
        let json =
            serde_json::to_value(reader.read(MetricFamily::OvernightGap, &window())).expect("json");
        assert!(json["data"][0]["gap_percent"].is_null());
        assert!(json["data"][0].get("gap_percent").is_some());
    }

    #[test]
    fn empty_window_is_success_with_zero_count() {
        let store = MemoryStore::new();
        let reader = SeriesReader::new(&store, TimestampNormalizer::default());
        let json =
            serde_json::to_value(reader.read(MetricFamily::VixLevel, &window())).expect("json");
        assert_eq!(json, json!({"status": "success", "count": 0, "data": []}));
    }

    #[test]
    fn store_failure_is_error_payload() {
        let store = MemoryStore::new();
        store.fail_reads();
        let reader = SeriesReader::new(&store, TimestampNormalizer::default());
        let response = reader.read(MetricFamily::TreasuryYield, &window());
        assert!(!response.is_success());
        let json = serde_json::to_value(&response).expect("json");
        assert_eq!(json["status"], "error");
        assert!(json.get("count").is_none());
    }
}

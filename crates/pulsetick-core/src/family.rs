//! Metric families: which provider, which instruments, which fields, which
//! stored metrics, and how the reader names them.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data_source::SeriesField;
use crate::domain::{
    NQ_CLOSE, OVERNIGHT_GAP_PERCENT, OVERNIGHT_GAP_POINTS, PUT_CALL_RATIO, TREASURY_10Y_YIELD,
    VIX_LEVEL,
};
use crate::{ProviderId, ValidationError};

const NASDAQ_CANDIDATES: &[&str] = &["NQ=F", "^NDX", "QQQ"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricFamily {
    NqClose,
    VixLevel,
    TreasuryYield,
    OvernightGap,
    PutCallRatio,
}

/// How a fetched series turns into stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// One sample per day taken straight from `field`.
    Field {
        field: SeriesField,
        metric: &'static str,
        reader_field: &'static str,
    },
    /// Two samples per day from today's open and the previous close.
    OvernightGap {
        points: &'static str,
        percent: &'static str,
    },
}

impl MetricFamily {
    /// Collection order used by `collect_all`.
    pub const ALL: [Self; 5] = [
        Self::NqClose,
        Self::VixLevel,
        Self::TreasuryYield,
        Self::OvernightGap,
        Self::PutCallRatio,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NqClose => "nq-close",
            Self::VixLevel => "vix-level",
            Self::TreasuryYield => "treasury-yield",
            Self::OvernightGap => "overnight-gap",
            Self::PutCallRatio => "put-call-ratio",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NqClose => "NQ closing prices",
            Self::VixLevel => "VIX levels",
            Self::TreasuryYield => "10-year treasury yields",
            Self::OvernightGap => "overnight gaps",
            Self::PutCallRatio => "put/call ratios",
        }
    }

    pub const fn provider(self) -> ProviderId {
        match self {
            Self::TreasuryYield => ProviderId::Fred,
            _ => ProviderId::Yahoo,
        }
    }

    /// Instrument identifiers, tried in order until one returns data.
    pub const fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::NqClose | Self::OvernightGap => NASDAQ_CANDIDATES,
            Self::VixLevel => &["^VIX"],
            Self::TreasuryYield => &["DGS10"],
            Self::PutCallRatio => &["^PCCE", "^CPC", "^PCR"],
        }
    }

    pub const fn transform(self) -> Transform {
        match self {
            Self::NqClose => Transform::Field {
                field: SeriesField::Close,
                metric: NQ_CLOSE,
                reader_field: "close_price",
            },
            Self::VixLevel => Transform::Field {
                field: SeriesField::Close,
                metric: VIX_LEVEL,
                reader_field: "vix_level",
            },
            Self::TreasuryYield => Transform::Field {
                field: SeriesField::Value,
                metric: TREASURY_10Y_YIELD,
                reader_field: "treasury_10y_yield",
            },
            Self::PutCallRatio => Transform::Field {
                field: SeriesField::Close,
                metric: PUT_CALL_RATIO,
                reader_field: "put_call_ratio",
            },
            Self::OvernightGap => Transform::OvernightGap {
                points: OVERNIGHT_GAP_POINTS,
                percent: OVERNIGHT_GAP_PERCENT,
            },
        }
    }

    /// Stored metric names this family writes.
    pub const fn metric_names(self) -> &'static [&'static str] {
        match self {
            Self::NqClose => &[NQ_CLOSE],
            Self::VixLevel => &[VIX_LEVEL],
            Self::TreasuryYield => &[TREASURY_10Y_YIELD],
            Self::PutCallRatio => &[PUT_CALL_RATIO],
            Self::OvernightGap => &[OVERNIGHT_GAP_POINTS, OVERNIGHT_GAP_PERCENT],
        }
    }
}

impl Display for MetricFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricFamily {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|family| family.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidFamily {
                value: value.to_owned(),
            })
    }
}

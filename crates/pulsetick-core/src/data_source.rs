//! Series source contract and the raw point types adapters produce.
//!
//! Adapters fetch one instrument over one date window and return
//! [`SeriesPoint`]s whose timestamps and values are still in provider form.
//! Normalization and sentinel handling happen in the collector.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::domain::{DateWindow, RawTimestamp};
use crate::ProviderId;

/// Text FRED uses for "no observation" days.
pub const MISSING_OBSERVATION: &str = ".";

/// Named columns a series point can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeriesField {
    Open,
    Close,
    Value,
}

impl SeriesField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Value => "value",
        }
    }
}

impl Display for SeriesField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cell exactly as the provider reported it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Null,
}

/// A cell after sentinel screening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Observed(f64),
    /// The provider marked the day as having no value.
    Missing,
}

impl FieldValue {
    pub const fn observed(self) -> Option<f64> {
        match self {
            Self::Observed(value) => Some(value),
            Self::Missing => None,
        }
    }
}

/// A cell that is neither a number nor a recognized sentinel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("field '{field}' is absent")]
    Absent { field: SeriesField },
    #[error("field '{field}' is not numeric: '{raw}'")]
    Unparseable { field: SeriesField, raw: String },
    #[error("field '{field}' is not finite")]
    NonFinite { field: SeriesField },
    #[error("timestamp '{raw}' is unreadable")]
    UnreadableTimestamp { raw: String },
}

/// One provider row: a timestamp plus whatever fields the provider sent.
///
/// A row whose timestamp could not be read is still handed over, so the
/// collector can count it as a failed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: Result<RawTimestamp, FieldError>,
    values: BTreeMap<SeriesField, RawValue>,
}

impl SeriesPoint {
    pub fn new(timestamp: RawTimestamp) -> Self {
        Self {
            timestamp: Ok(timestamp),
            values: BTreeMap::new(),
        }
    }

    pub fn unreadable(raw: impl Into<String>) -> Self {
        Self {
            timestamp: Err(FieldError::UnreadableTimestamp { raw: raw.into() }),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: SeriesField, value: RawValue) -> Self {
        self.values.insert(field, value);
        self
    }

    /// Screen one field. Nulls, empty text, and `"."` are [`FieldValue::Missing`].
    pub fn field(&self, field: SeriesField) -> Result<FieldValue, FieldError> {
        match self.values.get(&field) {
            None => Err(FieldError::Absent { field }),
            Some(RawValue::Null) => Ok(FieldValue::Missing),
            Some(RawValue::Number(value)) => finite(field, *value),
            Some(RawValue::Text(text)) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed == MISSING_OBSERVATION {
                    return Ok(FieldValue::Missing);
                }
                let value = trimmed
                    .parse::<f64>()
                    .map_err(|_| FieldError::Unparseable {
                        field,
                        raw: text.clone(),
                    })?;
                finite(field, value)
            }
        }
    }
}

fn finite(field: SeriesField, value: f64) -> Result<FieldValue, FieldError> {
    if value.is_finite() {
        Ok(FieldValue::Observed(value))
    } else {
        Err(FieldError::NonFinite { field })
    }
}

/// Request for one instrument over one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub identifier: String,
    pub window: DateWindow,
}

impl SeriesRequest {
    pub fn new(identifier: impl Into<String>, window: DateWindow) -> Result<Self, SourceError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(SourceError::invalid_request(
                "series request identifier must not be empty",
            ));
        }
        Ok(Self { identifier, window })
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    InvalidRequest,
    Malformed,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    /// The provider answered, but not in a shape we can read.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Malformed => "source.malformed",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Provider adapter contract.
///
/// An empty `Vec` means the provider knows nothing for this identifier and
/// window; it is not an error. Implementations must be `Send + Sync`.
pub trait SeriesSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn fetch<'a>(
        &'a self,
        req: SeriesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeriesPoint>, SourceError>> + Send + 'a>>;
}

use thiserror::Error;

/// Validation errors for configuration, windows, and identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },
    #[error("date window start {start} is after end {end}")]
    InvalidWindow { start: String, end: String },

    #[error(
        "invalid family '{value}', expected one of nq-close, vix-level, treasury-yield, \
         overnight-gap, put-call-ratio"
    )]
    InvalidFamily { value: String },
    #[error("invalid source '{value}', expected one of yahoo, fred")]
    InvalidSource { value: String },
    #[error("invalid data type '{value}', expected eod or premarket")]
    InvalidDataType { value: String },
    #[error("unknown time zone '{value}'")]
    InvalidTimezone { value: String },

    #[error("instrument identifier cannot be empty")]
    EmptyIdentifier,
    #[error("field '{field}' must be a positive integer: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

mod metric;
mod status;
mod timestamp;

pub use metric::*;
pub use status::ResultStatus;
pub use timestamp::{
    format_timestamp, parse_zone, RawTimestamp, TimestampNormalizer, DEFAULT_REFERENCE_ZONE,
};

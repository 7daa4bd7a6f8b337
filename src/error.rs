use thiserror::Error;
use time::OffsetDateTime;

/// Why a history record was excluded from the sample store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("record has unexpected shape: {0}")]
    Shape(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a number: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field `{field}` is negative: {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("field `{field}` is not finite")]
    NonFinite { field: &'static str },

    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),

    #[error("timestamp {timestamp} is not after the previous sample at {previous}")]
    OutOfOrder {
        timestamp: OffsetDateTime,
        previous: OffsetDateTime,
    },
}

/// Errors from parsing query parameters given as strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown period `{0}` (expected 24h, 7d or 30d)")]
    Period(String),

    #[error("unknown metric `{0}` (expected p50, p95 or p99)")]
    Metric(String),
}

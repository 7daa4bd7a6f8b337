use crate::error::{ParseError, SampleError};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use time::{Date, OffsetDateTime, UtcOffset};

/// One completed burst cycle, reduced to its latency percentiles (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Sample {
    /// Build a sample, rejecting negative or non-finite latencies.
    pub fn new(
        timestamp: OffsetDateTime,
        p50: f64,
        p95: f64,
        p99: f64,
    ) -> Result<Self, SampleError> {
        Ok(Self {
            timestamp: timestamp.to_offset(UtcOffset::UTC),
            p50: check_latency("p50", p50)?,
            p95: check_latency("p95", p95)?,
            p99: check_latency("p99", p99)?,
        })
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::P50 => self.p50,
            Metric::P95 => self.p95,
            Metric::P99 => self.p99,
        }
    }

    /// Largest of the three percentiles.
    pub fn peak(&self) -> f64 {
        self.p50.max(self.p95).max(self.p99)
    }

    /// Calendar date of the sample in UTC.
    pub fn date(&self) -> Date {
        self.timestamp.to_offset(UtcOffset::UTC).date()
    }
}

pub(crate) fn check_latency(field: &'static str, value: f64) -> Result<f64, SampleError> {
    if !value.is_finite() {
        return Err(SampleError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(SampleError::Negative { field, value });
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    P50,
    P95,
    P99,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::P50, Metric::P95, Metric::P99];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::P50 => "p50",
            Metric::P95 => "p95",
            Metric::P99 => "p99",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p50" => Ok(Metric::P50),
            "p95" => Ok(Metric::P95),
            "p99" => Ok(Metric::P99),
            _ => Err(ParseError::Metric(s.to_string())),
        }
    }
}

/// Named lookback period. Samples are assumed to arrive hourly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Period {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Day, Period::Week, Period::Month];

    /// Maximum number of hourly samples the period can hold.
    pub fn max_count(self) -> usize {
        match self {
            Period::Day => 24,
            Period::Week => 168,
            Period::Month => 720,
        }
    }

    /// Wall-clock span covered by a full window.
    pub fn span(self) -> Duration {
        Duration::from_secs(self.max_count() as u64 * 3600)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "24h",
            Period::Week => "7d",
            Period::Month => "30d",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Week
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" => Ok(Period::Day),
            "7d" => Ok(Period::Week),
            "30d" => Ok(Period::Month),
            _ => Err(ParseError::Period(s.to_string())),
        }
    }
}

/// How samples are assigned to a rollup date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGrouping {
    /// The UTC calendar date of each sample's timestamp.
    Calendar,
    /// Every sample lands on the given date. Matches the legacy dashboard,
    /// which bucketed the whole history under "today".
    ReferenceDay(Date),
}

impl DateGrouping {
    pub fn key(&self, sample: &Sample) -> Date {
        match self {
            DateGrouping::Calendar => sample.date(),
            DateGrouping::ReferenceDay(day) => *day,
        }
    }
}

impl Default for DateGrouping {
    fn default() -> Self {
        DateGrouping::Calendar
    }
}

/// Statistical rollup of every sample sharing a date. Values are rounded to
/// one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    pub avg_p50: f64,
    pub avg_p95: f64,
    pub max_p99: f64,
    pub std_dev_p50: f64,
    pub sample_count: usize,
}

fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(date)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCommand {
    MoveTo,
    LineTo,
}

/// A sample value placed on the virtual canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub command: PathCommand,
}

/// Virtual drawing surface. Callers scale to the real display themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 400.0,
        }
    }
}

/// Which series the caller wants drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub p50: bool,
    pub p95: bool,
    pub p99: bool,
}

impl Visibility {
    pub fn is_visible(&self, metric: Metric) -> bool {
        match metric {
            Metric::P50 => self.p50,
            Metric::P95 => self.p95,
            Metric::P99 => self.p99,
        }
    }

    pub fn metrics(self) -> impl Iterator<Item = Metric> {
        Metric::ALL.into_iter().filter(move |m| self.is_visible(*m))
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            p50: true,
            p95: true,
            p99: true,
        }
    }
}

use crate::error::SampleError;
use crate::model::{check_latency, DailyAggregate, Sample};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Get the base directory for application data.
fn base_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rise-latency-monitor")
}

/// Default location of the collector's history file.
pub fn default_history_path() -> PathBuf {
    base_dir().join("history.json")
}

/// Ordered, in-memory sample sequence with strictly increasing timestamps.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    samples: Vec<Sample>,
}

impl SampleStore {
    /// Build a store, dropping (and logging) samples that break timestamp order.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut store = Self::default();
        for sample in samples {
            if let Err(e) = store.push(sample) {
                tracing::warn!(error = %e, "excluding sample");
            }
        }
        store
    }

    /// Append a sample, which must be strictly newer than the current last one.
    pub fn push(&mut self, sample: Sample) -> Result<(), SampleError> {
        if let Some(last) = self.samples.last() {
            if sample.timestamp <= last.timestamp {
                return Err(SampleError::OutOfOrder {
                    timestamp: sample.timestamp,
                    previous: last.timestamp,
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One entry of `history.json` as written by the collector. Older files only
/// carry a wall-clock `time` ("HH:MM"); newer ones carry a full `timestamp`.
#[derive(Debug, Clone, Default, Deserialize)]
struct HistoryRecord {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    p50: Option<Value>,
    #[serde(default)]
    p95: Option<Value>,
    #[serde(default)]
    p99: Option<Value>,
}

#[derive(Debug, Clone, Copy)]
enum Stamp {
    Full(OffsetDateTime),
    Clock(Time),
}

#[derive(Debug, Clone, Copy)]
struct Parsed {
    stamp: Stamp,
    p50: f64,
    p95: f64,
    p99: f64,
}

/// Outcome of turning raw history entries into a store.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub store: SampleStore,
    /// Index of each rejected entry with the reason.
    pub rejected: Vec<(usize, SampleError)>,
    /// Entries whose date was inferred from a clock-only `time` field.
    pub inferred_dates: usize,
}

/// Read the history file as a JSON array of raw entries.
pub fn read_history(path: &Path) -> Result<Vec<Value>> {
    let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let entries: Vec<Value> =
        serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(entries)
}

/// Load the history file into a store. An unreadable feed degrades to an
/// empty store, and malformed entries are skipped.
pub fn load_store(path: &Path, now: OffsetDateTime) -> SampleStore {
    let entries = match read_history(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "history unavailable, using empty feed");
            return SampleStore::default();
        }
    };
    let report = parse_entries(entries, now);
    for (index, error) in &report.rejected {
        tracing::warn!(index, error = %error, "excluding malformed history entry");
    }
    if report.inferred_dates > 0 {
        tracing::warn!(
            count = report.inferred_dates,
            "history entries carry only a clock time; dates inferred from the reference instant"
        );
    }
    tracing::debug!(samples = report.store.len(), path = %path.display(), "loaded history");
    report.store
}

/// Validate raw entries and build a store from the valid ones, in file order.
/// `now` anchors clock-only entries to a calendar date.
pub fn parse_entries(entries: Vec<Value>, now: OffsetDateTime) -> LoadReport {
    let mut report = LoadReport::default();
    let mut parsed: Vec<(usize, Parsed)> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match parse_entry(entry) {
            Ok(p) => parsed.push((index, p)),
            Err(e) => report.rejected.push((index, e)),
        }
    }

    report.inferred_dates = anchor_clock_times(&mut parsed, now);

    for (index, p) in parsed {
        let Stamp::Full(timestamp) = p.stamp else {
            continue;
        };
        let sample = Sample {
            timestamp,
            p50: p.p50,
            p95: p.p95,
            p99: p.p99,
        };
        if let Err(e) = report.store.push(sample) {
            report.rejected.push((index, e));
        }
    }
    report.rejected.sort_by_key(|(index, _)| *index);
    report
}

fn parse_entry(entry: Value) -> Result<Parsed, SampleError> {
    let record: HistoryRecord =
        serde_json::from_value(entry).map_err(|e| SampleError::Shape(e.to_string()))?;
    let stamp = match (record.timestamp.as_deref(), record.time.as_deref()) {
        (Some(ts), _) => Stamp::Full(parse_timestamp(ts)?),
        (None, Some(clock)) => Stamp::Clock(parse_clock(clock)?),
        (None, None) => return Err(SampleError::MissingField("timestamp")),
    };
    Ok(Parsed {
        stamp,
        p50: latency("p50", record.p50)?,
        p95: latency("p95", record.p95)?,
        p99: latency("p99", record.p99)?,
    })
}

fn latency(field: &'static str, value: Option<Value>) -> Result<f64, SampleError> {
    let value = match value {
        None | Some(Value::Null) => return Err(SampleError::MissingField(field)),
        Some(v) => v,
    };
    let ms = value.as_f64().ok_or_else(|| SampleError::NotNumeric {
        field,
        value: value.to_string(),
    })?;
    check_latency(field, ms)
}

/// RFC 3339, or a naive ISO 8601 date-time which is taken as UTC.
fn parse_timestamp(s: &str) -> Result<OffsetDateTime, SampleError> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(s, naive)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| SampleError::InvalidTimestamp(s.to_string()))
}

fn parse_clock(s: &str) -> Result<Time, SampleError> {
    Time::parse(s.trim(), format_description!("[hour]:[minute]"))
        .map_err(|_| SampleError::InvalidTimestamp(s.to_string()))
}

/// Give clock-only entries a date. The newest one lands on the reference
/// date (or the day before if its clock is later than `now`); walking
/// backwards, each time the clock fails to decrease we step back one day.
fn anchor_clock_times(parsed: &mut [(usize, Parsed)], now: OffsetDateTime) -> usize {
    let now = now.to_offset(UtcOffset::UTC);
    let mut day = now.date();
    let mut later: Option<Time> = None;
    let mut anchored = 0;
    for (_, p) in parsed.iter_mut().rev() {
        let Stamp::Clock(clock) = p.stamp else {
            continue;
        };
        let rolls_back = match later {
            Some(next) => clock >= next,
            None => clock > now.time(),
        };
        if rolls_back {
            if let Some(prev) = day.previous_day() {
                day = prev;
            }
        }
        later = Some(clock);
        p.stamp = Stamp::Full(PrimitiveDateTime::new(day, clock).assume_utc());
        anchored += 1;
    }
    anchored
}

pub fn export_json(path: &Path, aggregates: &[DailyAggregate]) -> Result<()> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("create export directory")?;
    }
    let data = serde_json::to_vec_pretty(aggregates)?;
    std::fs::write(path, data).context("write export json")?;
    Ok(())
}

pub fn export_csv(path: &Path, aggregates: &[DailyAggregate]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("create export directory")?;
    }
    let mut out = String::new();
    out.push_str("date,avg_p50_ms,avg_p95_ms,max_p99_ms,std_dev_p50_ms,samples\n");
    for a in aggregates {
        out.push_str(&format!(
            "{},{:.1},{:.1},{:.1},{:.1},{}\n",
            a.date, a.avg_p50, a.avg_p95, a.max_p99, a.std_dev_p50, a.sample_count
        ));
    }
    std::fs::write(path, out).context("write export csv")?;
    Ok(())
}

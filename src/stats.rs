use crate::model::{DailyAggregate, DateGrouping, Sample};
use crate::window::Window;
use std::collections::BTreeMap;
use time::Date;

/// Number of most recent dates kept in the daily rollup.
pub const MAX_DAYS: usize = 7;

/// Values of one metric column for a single bucket, kept so the spread can be
/// taken around the final mean.
#[derive(Debug, Default, Clone)]
pub struct ColumnStats {
    values: Vec<f64>,
    sum: f64,
}

impl ColumnStats {
    pub fn push(&mut self, x: f64) {
        self.values.push(x);
        self.sum += x;
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Arithmetic mean as `sum / count`.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / (self.values.len() as f64))
        }
    }

    /// Population standard deviation (divides by `n`, not `n - 1`).
    ///
    /// Two passes: deviations are measured from `sum / n`, not from a running mean.
    pub fn population_stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.values.len() as f64;
        let squares: f64 = self.values.iter().map(|x| (x - mean).powi(2)).sum();
        Some((squares / n).sqrt())
    }
}

/// Round half away from zero to one decimal place.
pub fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[derive(Debug, Default)]
struct DayBucket {
    p50: ColumnStats,
    p95: ColumnStats,
    max_p99: f64,
}

impl DayBucket {
    fn push(&mut self, sample: &Sample) {
        // Latencies are non-negative, so 0.0 is a safe starting maximum.
        self.max_p99 = self.max_p99.max(sample.p99);
        self.p50.push(sample.p50);
        self.p95.push(sample.p95);
    }

    fn finish(self, date: Date) -> DailyAggregate {
        DailyAggregate {
            date,
            avg_p50: round_one_decimal(self.p50.mean().unwrap_or(0.0)),
            avg_p95: round_one_decimal(self.p95.mean().unwrap_or(0.0)),
            max_p99: round_one_decimal(self.max_p99),
            std_dev_p50: round_one_decimal(self.p50.population_stddev().unwrap_or(0.0)),
            sample_count: self.p50.count(),
        }
    }
}

/// Daily rollups for the window, newest date first, at most [`MAX_DAYS`] entries.
pub fn aggregate(window: Window<'_>, grouping: DateGrouping) -> Vec<DailyAggregate> {
    let mut buckets: BTreeMap<Date, DayBucket> = BTreeMap::new();
    for sample in window {
        buckets.entry(grouping.key(sample)).or_default().push(sample);
    }

    tracing::debug!(
        samples = window.len(),
        days = buckets.len(),
        "aggregated daily rollups"
    );

    buckets
        .into_iter()
        .rev()
        .take(MAX_DAYS)
        .map(|(date, bucket)| bucket.finish(date))
        .collect()
}

use crate::model::Sample;
use crate::storage::SampleStore;
use crate::window::Window;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

/// Point-in-time status read: the newest sample, or nothing yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Latest {
    Sample(Sample),
    NoData,
}

impl Latest {
    pub fn sample(&self) -> Option<&Sample> {
        match self {
            Latest::Sample(s) => Some(s),
            Latest::NoData => None,
        }
    }

    /// `(p50, p95, p99)`, zeroed when there is no data.
    pub fn values(&self) -> (f64, f64, f64) {
        match self {
            Latest::Sample(s) => (s.p50, s.p95, s.p99),
            Latest::NoData => (0.0, 0.0, 0.0),
        }
    }

    /// Time elapsed since the newest sample, relative to `now`.
    pub fn age(&self, now: OffsetDateTime) -> Option<Duration> {
        self.sample().map(|s| now - s.timestamp)
    }

    /// Whether the feed has gone quiet for longer than `max_age`. No data is
    /// always stale.
    pub fn is_stale(&self, now: OffsetDateTime, max_age: std::time::Duration) -> bool {
        match self.age(now) {
            Some(age) => age > max_age,
            None => true,
        }
    }
}

pub fn latest(store: &SampleStore) -> Latest {
    match store.samples().last() {
        Some(s) => Latest::Sample(*s),
        None => Latest::NoData,
    }
}

/// A raw sample as shown in the recent-samples stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecentRow {
    #[serde(flatten)]
    pub sample: Sample,
    /// Half the gap between p95 and p50.
    pub spread: f64,
}

/// The last `limit` samples of the window, newest first.
pub fn recent(window: Window<'_>, limit: usize) -> Vec<RecentRow> {
    window
        .iter()
        .rev()
        .take(limit)
        .map(|s| RecentRow {
            sample: *s,
            spread: (s.p95 - s.p50) / 2.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn store(p99s: &[f64]) -> SampleStore {
        let start = datetime!(2026-10-16 00:00 UTC);
        SampleStore::from_samples(p99s.iter().enumerate().map(|(i, &p99)| {
            Sample::new(start + Duration::hours(i as i64), 10.0, 30.0, p99).unwrap()
        }))
    }

    #[test]
    fn test_latest_of_empty_store_is_no_data() {
        let l = latest(&SampleStore::default());
        assert_eq!(l, Latest::NoData);
        assert_eq!(l.values(), (0.0, 0.0, 0.0));
        assert!(l.age(datetime!(2026-10-16 00:00 UTC)).is_none());
        assert!(l.is_stale(datetime!(2026-10-16 00:00 UTC), std::time::Duration::from_secs(3600)));
    }

    #[test]
    fn test_latest_is_last_sample() {
        let s = store(&[100.0, 7.0, 42.0]);
        let l = latest(&s);
        assert_eq!(l.sample().map(|s| s.p99), Some(42.0));
        assert_eq!(l.values(), (10.0, 30.0, 42.0));
    }

    #[test]
    fn test_staleness_uses_reference_instant() {
        let s = store(&[1.0]);
        let l = latest(&s);
        let max_age = std::time::Duration::from_secs(2 * 3600);
        assert_eq!(l.age(datetime!(2026-10-16 01:30 UTC)), Some(Duration::minutes(90)));
        assert!(!l.is_stale(datetime!(2026-10-16 01:30 UTC), max_age));
        assert!(l.is_stale(datetime!(2026-10-16 02:00:01 UTC), max_age));
    }

    #[test]
    fn test_recent_newest_first() {
        let s = store(&[1.0, 2.0, 3.0, 4.0]);
        let rows = recent(Window::trailing(s.samples(), 24), 3);
        assert_eq!(rows.iter().map(|r| r.sample.p99).collect::<Vec<_>>(), vec![4.0, 3.0, 2.0]);
        assert!(rows.iter().all(|r| r.spread == 10.0));
        assert!(recent(Window::trailing(s.samples(), 0), 10).is_empty());
    }

    #[test]
    fn test_latest_json() {
        let v = serde_json::to_value(latest(&SampleStore::default())).unwrap();
        assert_eq!(v, serde_json::json!({"status": "no_data"}));
        let v = serde_json::to_value(latest(&store(&[42.0]))).unwrap();
        assert_eq!(v["status"], "sample");
        assert_eq!(v["p99"], 42.0);
        assert_eq!(v["timestamp"], "2026-10-16T00:00:00Z");
    }
}

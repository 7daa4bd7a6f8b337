use crate::model::{Metric, Period, Sample};
use crate::storage::SampleStore;

/// Read-only view over the trailing part of a sample store.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    samples: &'a [Sample],
    offset: usize,
}

impl<'a> Window<'a> {
    /// The last `count` samples of `samples`, or all of them if there are fewer.
    pub fn trailing(samples: &'a [Sample], count: usize) -> Self {
        let offset = samples.len().saturating_sub(count);
        Self {
            samples: &samples[offset..],
            offset,
        }
    }

    pub fn samples(&self) -> &'a [Sample] {
        self.samples
    }

    /// Index of the window's first sample within the store.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Sample> {
        self.samples.iter()
    }

    pub fn first(&self) -> Option<&'a Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&'a Sample> {
        self.samples.last()
    }

    /// One metric column, in sample order.
    pub fn values(&self, metric: Metric) -> impl Iterator<Item = f64> + 'a {
        self.samples.iter().map(move |s| s.value(metric))
    }
}

impl<'a> IntoIterator for Window<'a> {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Select the samples covered by `period` from the end of the store.
pub fn select(store: &SampleStore, period: Period) -> Window<'_> {
    Window::trailing(store.samples(), period.max_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    fn hourly(n: usize) -> SampleStore {
        let start = datetime!(2026-09-01 00:00 UTC);
        SampleStore::from_samples((0..n).map(|i| {
            Sample::new(start + Duration::hours(i as i64), i as f64, 0.0, 0.0).unwrap()
        }))
    }

    #[test]
    fn test_select_caps_at_period_count() {
        for n in [0usize, 1, 23, 24, 25, 200, 1000] {
            let store = hourly(n);
            for period in Period::ALL {
                let w = select(&store, period);
                assert_eq!(w.len(), n.min(period.max_count()), "n={n} period={period}");
            }
        }
    }

    #[test]
    fn test_select_keeps_trailing_samples() {
        let store = hourly(30);
        let w = select(&store, Period::Day);
        assert_eq!(w.offset(), 6);
        assert_eq!(w.first().map(|s| s.p50), Some(6.0));
        assert_eq!(w.last().map(|s| s.p50), Some(29.0));
        assert_eq!(w.values(Metric::P50).count(), 24);
    }

    #[test]
    fn test_select_empty_store() {
        let store = SampleStore::default();
        let w = select(&store, Period::Month);
        assert!(w.is_empty());
        assert_eq!(w.offset(), 0);
        assert!(w.last().is_none());
    }
}

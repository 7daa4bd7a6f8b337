//! Maps windowed latency values onto a fixed virtual canvas.
//!
//! The vertical scale is derived from the window being drawn, so a quiet day
//! and a spiky month get different axes. Output is a polyline: the first point
//! moves the pen, every later point draws a straight segment.

use crate::model::{Canvas, Metric, PathCommand, PlotPoint, Sample, Visibility};
use crate::window::Window;
use serde::Serialize;
use std::fmt::Write;
use time::OffsetDateTime;

/// Vertical scale used when the window has nothing above zero.
pub const MIN_Y_MAX: f64 = 500.0;
/// Granularity the vertical scale is rounded up to.
pub const Y_STEP: f64 = 100.0;
/// Number of horizontal grid lines, top to bottom.
pub const Y_TICKS: usize = 5;
/// Windows up to this size get a time label under every sample.
pub const MAX_FULL_LABELS: usize = 5;

/// Top of the vertical axis for this window, across all three percentiles.
pub fn y_max(window: Window<'_>) -> f64 {
    let peak = window.iter().map(Sample::peak).fold(0.0, f64::max);
    if peak > 0.0 {
        (peak / Y_STEP).ceil() * Y_STEP
    } else {
        MIN_Y_MAX
    }
}

/// Lazily computed polyline for one metric column.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    samples: &'a [Sample],
    metric: Metric,
    canvas: Canvas,
    y_max: f64,
    index: usize,
    end: usize,
}

impl Projection<'_> {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    fn x(&self, index: usize) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            // A lone sample is stretched across the full width.
            1 => {
                if index == 0 {
                    0.0
                } else {
                    self.canvas.width
                }
            }
            n => index as f64 / (n - 1) as f64 * self.canvas.width,
        }
    }

    fn y(&self, value: f64) -> f64 {
        let h = self.canvas.height;
        h - h * (value / self.y_max).min(1.0)
    }
}

impl Iterator for Projection<'_> {
    type Item = PlotPoint;

    fn next(&mut self) -> Option<PlotPoint> {
        if self.index >= self.end {
            return None;
        }
        let i = self.index;
        self.index += 1;
        let sample = &self.samples[i.min(self.samples.len() - 1)];
        Some(PlotPoint {
            x: self.x(i),
            y: self.y(sample.value(self.metric)),
            command: if i == 0 {
                PathCommand::MoveTo
            } else {
                PathCommand::LineTo
            },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.index;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Projection<'_> {}

/// Project one metric of the window onto `canvas`.
pub fn project(window: Window<'_>, metric: Metric, canvas: Canvas) -> Projection<'_> {
    let samples = window.samples();
    Projection {
        samples,
        metric,
        canvas,
        y_max: y_max(window),
        index: 0,
        end: if samples.len() == 1 { 2 } else { samples.len() },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub metric: Metric,
    pub points: Vec<PlotPoint>,
}

/// Project every metric the caller has switched on, in p50, p95, p99 order.
pub fn project_visible(window: Window<'_>, visibility: Visibility, canvas: Canvas) -> Vec<Series> {
    visibility
        .metrics()
        .map(|metric| Series {
            metric,
            points: project(window, metric, canvas).collect(),
        })
        .collect()
}

/// Grid line values from `y_max` down to zero.
pub fn y_ticks(y_max: f64) -> [f64; Y_TICKS] {
    let steps = (Y_TICKS - 1) as f64;
    std::array::from_fn(|i| y_max * (steps - i as f64) / steps)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisLabel {
    pub index: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Samples to label on the time axis: all of them for short windows,
/// otherwise the first, middle and last.
pub fn x_labels(window: Window<'_>) -> Vec<AxisLabel> {
    let samples = window.samples();
    let label = |index: usize| AxisLabel {
        index,
        timestamp: samples[index].timestamp,
    };
    if samples.len() <= MAX_FULL_LABELS {
        (0..samples.len()).map(label).collect()
    } else {
        let n = samples.len();
        vec![label(0), label(n / 2), label(n - 1)]
    }
}

/// SVG path data (`M x,y L x,y ...`) for a projected series.
pub fn svg_path(points: impl IntoIterator<Item = PlotPoint>) -> String {
    let mut out = String::new();
    for p in points {
        if !out.is_empty() {
            out.push(' ');
        }
        let cmd = match p.command {
            PathCommand::MoveTo => 'M',
            PathCommand::LineTo => 'L',
        };
        let _ = write!(out, "{cmd}{},{}", p.x, p.y);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SampleStore;
    use time::macros::datetime;
    use time::Duration;

    fn store(values: &[(f64, f64, f64)]) -> SampleStore {
        let start = datetime!(2026-10-01 00:00 UTC);
        SampleStore::from_samples(values.iter().enumerate().map(|(i, &(a, b, c))| {
            Sample::new(start + Duration::hours(i as i64), a, b, c).unwrap()
        }))
    }

    fn all(s: &SampleStore) -> Window<'_> {
        Window::trailing(s.samples(), usize::MAX)
    }

    #[test]
    fn test_y_max_per_window() {
        let s = store(&[(10.0, 50.0, 73.0)]);
        assert_eq!(y_max(all(&s)), 100.0);
        let s = store(&[(100.0, 455.0, 300.0), (1.0, 2.0, 3.0)]);
        assert_eq!(y_max(all(&s)), 500.0);
        let s = store(&[(0.0, 0.0, 0.0), (0.0, 0.0, 0.0)]);
        assert_eq!(y_max(all(&s)), MIN_Y_MAX);
        assert_eq!(y_max(all(&SampleStore::default())), MIN_Y_MAX);
        let s = store(&[(10.0, 20.0, 800.0)]);
        assert_eq!(y_max(all(&s)), 800.0);
    }

    #[test]
    fn test_empty_window_projects_nothing() {
        let s = SampleStore::default();
        assert_eq!(project(all(&s), Metric::P50, Canvas::default()).count(), 0);
    }

    #[test]
    fn test_single_sample_draws_flat_line() {
        let s = store(&[(100.0, 200.0, 300.0)]);
        let pts: Vec<_> = project(all(&s), Metric::P95, Canvas::default()).collect();
        // y_max 300: 200/300 of the height from the bottom.
        let y = 400.0 - 400.0 * (200.0 / 300.0);
        assert_eq!(
            pts,
            vec![
                PlotPoint {
                    x: 0.0,
                    y,
                    command: PathCommand::MoveTo
                },
                PlotPoint {
                    x: 1000.0,
                    y,
                    command: PathCommand::LineTo
                },
            ]
        );
    }

    #[test]
    fn test_points_span_canvas_in_order() {
        let s = store(&[(0.0, 0.0, 100.0), (50.0, 0.0, 0.0), (100.0, 0.0, 0.0)]);
        let proj = project(all(&s), Metric::P50, Canvas::default());
        assert_eq!(proj.len(), 3);
        let pts: Vec<_> = proj.collect();
        assert_eq!(pts.iter().map(|p| p.x).collect::<Vec<_>>(), vec![0.0, 500.0, 1000.0]);
        assert_eq!(pts.iter().map(|p| p.y).collect::<Vec<_>>(), vec![400.0, 200.0, 0.0]);
        assert_eq!(pts[0].command, PathCommand::MoveTo);
        assert!(pts[1..].iter().all(|p| p.command == PathCommand::LineTo));
    }

    #[test]
    fn test_values_above_scale_are_clamped() {
        let s = store(&[(10.0, 10.0, 10.0)]);
        let w = all(&s);
        let proj = project(w, Metric::P50, Canvas::default());
        assert_eq!(proj.y(250.0), 0.0);
        assert_eq!(proj.y(0.0), 400.0);
    }

    #[test]
    fn test_projection_is_restartable() {
        let s = store(&[(12.5, 30.0, 47.0), (20.0, 44.0, 91.0), (3.0, 8.0, 13.0)]);
        let w = all(&s);
        let a: Vec<_> = project(w, Metric::P99, Canvas::default()).collect();
        let b: Vec<_> = project(w, Metric::P99, Canvas::default()).collect();
        assert_eq!(a, b);
        let proj = project(w, Metric::P99, Canvas::default());
        assert_eq!(proj.clone().collect::<Vec<_>>(), proj.collect::<Vec<_>>());
    }

    #[test]
    fn test_project_visible_skips_hidden_series() {
        let s = store(&[(1.0, 2.0, 3.0), (4.0, 5.0, 6.0)]);
        let series = project_visible(
            all(&s),
            Visibility {
                p50: false,
                p95: true,
                p99: true,
            },
            Canvas {
                width: 10.0,
                height: 10.0,
            },
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].metric, Metric::P95);
        assert_eq!(series[1].metric, Metric::P99);
        assert_eq!(series[1].points[1].x, 10.0);
    }

    #[test]
    fn test_y_ticks() {
        assert_eq!(y_ticks(800.0), [800.0, 600.0, 400.0, 200.0, 0.0]);
        assert_eq!(y_ticks(500.0), [500.0, 375.0, 250.0, 125.0, 0.0]);
    }

    #[test]
    fn test_x_labels() {
        let s = store(&[(1.0, 1.0, 1.0); 3]);
        let idx: Vec<_> = x_labels(all(&s)).iter().map(|l| l.index).collect();
        assert_eq!(idx, vec![0, 1, 2]);

        let s = store(&[(1.0, 1.0, 1.0); 9]);
        let labels = x_labels(all(&s));
        assert_eq!(labels.iter().map(|l| l.index).collect::<Vec<_>>(), vec![0, 4, 8]);
        assert_eq!(labels[2].timestamp, datetime!(2026-10-01 08:00 UTC));

        assert!(x_labels(all(&SampleStore::default())).is_empty());
    }

    #[test]
    fn test_svg_path() {
        let s = store(&[(100.0, 0.0, 0.0)]);
        let path = svg_path(project(all(&s), Metric::P50, Canvas::default()));
        assert_eq!(path, "M0,0 L1000,0");

        let s = store(&[(0.0, 0.0, 200.0), (100.0, 0.0, 0.0)]);
        let path = svg_path(project(all(&s), Metric::P50, Canvas::default()));
        assert_eq!(path, "M0,400 L1000,200");
        assert_eq!(svg_path(Vec::new()), "");
    }
}

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rise_latency_monitor::projector::{self, AxisLabel};
use rise_latency_monitor::snapshot::{self, RecentRow};
use rise_latency_monitor::{
    stats, storage, window, Canvas, DailyAggregate, DateGrouping, Latest, Metric, Period,
    PlotPoint, SampleStore, Visibility,
};
use serde::Serialize;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "rise-latency-monitor",
    version,
    about = "Daily rollups and chart series for RISE testnet latency history"
)]
pub struct Cli {
    /// Path to the collector's history.json (defaults to the local data dir)
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Lookback period: 24h, 7d or 30d
    #[arg(long, default_value = "7d")]
    pub period: Period,

    /// How samples are bucketed into days
    #[arg(long, value_enum, default_value_t = Grouping::Calendar)]
    pub grouping: Grouping,

    /// Reference instant (RFC 3339) to use instead of the wall clock
    #[arg(long, value_parser = parse_instant)]
    pub now: Option<OffsetDateTime>,

    /// Flag the latest sample as stale once it is older than this
    #[arg(long, default_value = "2h")]
    pub stale_after: humantime::Duration,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Include SVG path data for each visible series in text output
    #[arg(long)]
    pub svg: bool,

    /// Number of recent samples to list
    #[arg(long, default_value_t = 10)]
    pub recent: usize,

    /// Hide the P50 series
    #[arg(long)]
    pub hide_p50: bool,

    /// Hide the P95 series
    #[arg(long)]
    pub hide_p95: bool,

    /// Hide the P99 series
    #[arg(long)]
    pub hide_p99: bool,

    /// Virtual chart width
    #[arg(long, default_value_t = 1000.0)]
    pub canvas_width: f64,

    /// Virtual chart height
    #[arg(long, default_value_t = 400.0)]
    pub canvas_height: f64,

    /// Export the daily aggregates as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export the daily aggregates as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Grouping {
    /// UTC calendar date of each sample
    Calendar,
    /// Everything under the reference date (legacy dashboard behaviour)
    ReferenceDay,
}

fn parse_instant(s: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

impl Cli {
    fn visibility(&self) -> Visibility {
        Visibility {
            p50: !self.hide_p50,
            p95: !self.hide_p95,
            p99: !self.hide_p99,
        }
    }

    fn canvas(&self) -> Canvas {
        Canvas {
            width: self.canvas_width,
            height: self.canvas_height,
        }
    }

    fn date_grouping(&self, now: OffsetDateTime) -> DateGrouping {
        match self.grouping {
            Grouping::Calendar => DateGrouping::Calendar,
            Grouping::ReferenceDay => {
                DateGrouping::ReferenceDay(now.to_offset(UtcOffset::UTC).date())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct SeriesReport {
    metric: Metric,
    path: String,
    points: Vec<PlotPoint>,
}

#[derive(Debug, Serialize)]
struct ChartReport {
    canvas: Canvas,
    y_max: f64,
    y_ticks: [f64; projector::Y_TICKS],
    x_labels: Vec<AxisLabel>,
    series: Vec<SeriesReport>,
}

#[derive(Debug, Serialize)]
struct Report {
    #[serde(with = "time::serde::rfc3339")]
    reference: OffsetDateTime,
    period: Period,
    window_samples: usize,
    latest: Latest,
    stale: bool,
    daily: Vec<DailyAggregate>,
    recent: Vec<RecentRow>,
    chart: ChartReport,
}

pub fn run(args: Cli) -> Result<()> {
    if !(args.canvas_width > 0.0 && args.canvas_height > 0.0) {
        anyhow::bail!("--canvas-width and --canvas-height must be positive");
    }

    let now = args.now.unwrap_or_else(OffsetDateTime::now_utc);
    let path = args
        .history
        .clone()
        .unwrap_or_else(storage::default_history_path);
    let store = storage::load_store(&path, now);
    let report = build_report(&args, &store, now);

    handle_exports(&args, &report.daily)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&args, &report);
    }
    Ok(())
}

fn build_report(args: &Cli, store: &SampleStore, now: OffsetDateTime) -> Report {
    let window = window::select(store, args.period);
    let latest = snapshot::latest(store);
    let y_max = projector::y_max(window);
    let series = projector::project_visible(window, args.visibility(), args.canvas())
        .into_iter()
        .map(|s| SeriesReport {
            metric: s.metric,
            path: projector::svg_path(s.points.iter().copied()),
            points: s.points,
        })
        .collect();

    tracing::debug!(
        store = store.len(),
        window = window.len(),
        period = %args.period,
        "built report"
    );

    Report {
        reference: now,
        period: args.period,
        window_samples: window.len(),
        stale: latest.is_stale(now, args.stale_after.into()),
        latest,
        daily: stats::aggregate(window, args.date_grouping(now)),
        recent: snapshot::recent(window, args.recent),
        chart: ChartReport {
            canvas: args.canvas(),
            y_max,
            y_ticks: projector::y_ticks(y_max),
            x_labels: projector::x_labels(window),
            series,
        },
    }
}

/// Handle export operations for the daily aggregates table.
fn handle_exports(args: &Cli, daily: &[DailyAggregate]) -> Result<()> {
    if let Some(p) = args.export_json.as_deref() {
        storage::export_json(p, daily).context("failed to export daily aggregates as JSON")?;
        tracing::info!(
            path = %p.display(),
            rows = daily.len(),
            "exported daily aggregates as JSON"
        );
        eprintln!("Exported JSON: {}", p.display());
    }
    if let Some(p) = args.export_csv.as_deref() {
        storage::export_csv(p, daily).context("failed to export daily aggregates as CSV")?;
        tracing::info!(
            path = %p.display(),
            rows = daily.len(),
            "exported daily aggregates as CSV"
        );
        eprintln!("Exported CSV: {}", p.display());
    }
    Ok(())
}

fn fmt_ts(ts: OffsetDateTime) -> String {
    ts.to_offset(UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| ts.to_string())
}

fn print_text(args: &Cli, report: &Report) {
    println!(
        "RISE latency: {} window ({} of {} samples, {})",
        report.period,
        report.window_samples,
        report.period.max_count(),
        humantime::format_duration(report.period.span())
    );

    let (p50, p95, p99) = report.latest.values();
    match report.latest.sample() {
        Some(s) => {
            let age = report
                .latest
                .age(report.reference)
                .map(|a| std::time::Duration::from_secs(a.whole_seconds().max(0) as u64))
                .unwrap_or_default();
            println!(
                "Latest: {} UTC  P50 {:.1} ms  P95 {:.1} ms  P99 {:.1} ms  (age {}{})",
                fmt_ts(s.timestamp),
                p50,
                p95,
                p99,
                humantime::format_duration(age),
                if report.stale { ", stale" } else { "" }
            );
        }
        None => println!(
            "Latest: no data  P50 {:.1} ms  P95 {:.1} ms  P99 {:.1} ms",
            p50, p95, p99
        ),
    }

    println!();
    println!("Daily aggregates");
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>9} {:>8}",
        "Date", "Avg P50", "Avg P95", "Max P99", "Std Dev", "Samples"
    );
    if report.daily.is_empty() {
        println!("No data available.");
    }
    for a in &report.daily {
        println!(
            "{:<12} {:>8.1}ms {:>8.1}ms {:>8.1}ms {:>8.1} {:>8}",
            a.date.to_string(),
            a.avg_p50,
            a.avg_p95,
            a.max_p99,
            a.std_dev_p50,
            a.sample_count
        );
    }

    if args.recent > 0 {
        println!();
        println!("Recent samples");
        println!(
            "{:<17} {:>10} {:>10} {:>10} {:>8}",
            "Timestamp UTC", "P50", "P95", "P99", "Spread"
        );
        if report.recent.is_empty() {
            println!("No data available.");
        }
        for r in &report.recent {
            println!(
                "{:<17} {:>8.1}ms {:>8.1}ms {:>8.1}ms {:>8.1}",
                fmt_ts(r.sample.timestamp),
                r.sample.p50,
                r.sample.p95,
                r.sample.p99,
                r.spread
            );
        }
    }

    let chart = &report.chart;
    println!();
    let ticks: Vec<String> = chart.y_ticks.iter().map(|t| format!("{t}")).collect();
    println!("Chart scale: 0-{} ms (grid {})", chart.y_max, ticks.join(" / "));
    if !chart.x_labels.is_empty() {
        let labels: Vec<String> = chart.x_labels.iter().map(|l| fmt_ts(l.timestamp)).collect();
        println!("Time axis: {}", labels.join(" | "));
    }
    if args.svg {
        for s in &chart.series {
            println!("{}: {}", s.metric, s.path);
        }
    }
}

//! Aggregation engine for RISE testnet latency history.
//!
//! Samples flow from a [`storage::SampleStore`] through [`window::select`]
//! into the daily rollups ([`stats::aggregate`]), the chart projection
//! ([`projector::project`]) and the status read ([`snapshot::latest`]).
//! Every query is a pure function of its inputs; callers own the selected
//! period, series toggles and reference instant and pass them in per call.

pub mod error;
pub mod model;
pub mod projector;
pub mod snapshot;
pub mod stats;
pub mod storage;
pub mod window;

pub use error::{ParseError, SampleError};
pub use model::{
    Canvas, DailyAggregate, DateGrouping, Metric, PathCommand, Period, PlotPoint, Sample,
    Visibility,
};
pub use snapshot::Latest;
pub use storage::SampleStore;
pub use window::Window;

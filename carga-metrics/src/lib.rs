//! Metric storage shared by every virtual user of a run.
//!
//! Series are keyed by metric id plus an interned, sorted tag set. Counters,
//! gauges and rates are plain atomics; trends are HDR histograms recorded in
//! microseconds and summarized in milliseconds.

pub mod key;
pub mod metrics;
pub mod query;
pub mod registry;
pub mod tags;

pub use key::KeyId;
pub use metrics::{HistogramSummary, MetricHandle, MetricKind, MetricSeriesSummary, MetricValue};
pub use query::Query;
pub use registry::{MetricId, Registry};
pub use tags::TagSet;

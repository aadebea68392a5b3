//! Load-test engine: run options, VU scheduling, the per-iteration API,
//! thresholds and the end-of-run summary and report.

mod config;
mod error;
pub mod format;
mod gate;
mod iteration;
mod iteration_metrics;
mod metrics_agg;
mod metrics_context;
mod outputs;
mod progress;
mod report;
mod request_metrics;
mod run;
mod scenario;
mod schedule;
mod shared_array;
mod summary;
mod thresholds;
mod thresholds_eval;
mod vu;

pub use config::{
    DEFAULT_SCENARIO, RunConfig, ScenarioConfig, ScenarioExecutor, ScriptOptions, Stage,
    scenarios_from_options,
};
pub use error::{Error, Result};
pub use gate::IterationGate;
pub use iteration::{GroupGuard, Iteration};
pub use iteration_metrics::IterationMetricIds;
pub use metrics_context::MetricsContext;
pub use outputs::{SummaryOutputs, write_output_files};
pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate, ScenarioProgress, StageProgress};
pub use report::html_report;
pub use request_metrics::{RequestMetricIds, RequestSample};
pub use run::{EnvVars, RunContext, env_lookup, process_env_snapshot, run_scenarios};
pub use scenario::{IterationFuture, Scenario};
pub use schedule::{RampingSchedule, StageSnapshot};
pub use shared_array::SharedArray;
pub use summary::{CheckSummary, MetricSummary, RunSummary, ScenarioSummary, ThresholdResult};
pub use thresholds::{ThresholdAgg, ThresholdExpr, ThresholdOp, ThresholdSet, parse_threshold_expr};
pub use thresholds_eval::{ParsedThreshold, evaluate_thresholds, parse_threshold_sets};
pub use vu::{StartSignal, VuContext, VuWork};

pub use carga_http::{Headers, HttpRequest, HttpResponse, HttpTransportErrorKind};
pub use carga_metrics::{HistogramSummary, MetricKind, MetricValue};

use std::collections::BTreeMap;
use std::time::Duration;

use carga_metrics::{HistogramSummary, MetricKind, MetricValue};

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub scenarios: Vec<ScenarioSummary>,
    /// One entry per metric, all series merged, in registration order.
    pub metrics: Vec<MetricSummary>,
    pub checks: Vec<CheckSummary>,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunSummary {
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn threshold_violations(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|t| !t.passed)
    }

    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ScenarioSummary {
    pub scenario: String,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    pub iterations_total: u64,
    pub vus_max: u64,

    pub checks_failed_total: u64,
    pub checks_failed: BTreeMap<String, u64>,

    pub latency: Option<HistogramSummary>,
}

#[derive(Debug, Clone)]
pub struct MetricSummary {
    pub name: String,
    pub kind: MetricKind,
    pub values: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub group: Option<String>,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn total(&self) -> u64 {
        self.passes.saturating_add(self.fails)
    }

    /// Passing share in `0.0..=1.0`; 0 when the check never ran.
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passes as f64 / total as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    /// `None` when the metric has no data for the aggregation.
    pub observed: Option<f64>,
    pub passed: bool,
}

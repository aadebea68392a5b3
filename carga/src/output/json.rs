use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use carga_core::{HistogramSummary, MetricValue, ProgressUpdate, RunSummary, ScenarioProgress};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _base_url: &str, _scenarios: &[carga_core::ScenarioConfig]) {}

    fn progress(&self) -> Option<carga_core::ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, summary: &RunSummary, reports: &[PathBuf]) -> anyhow::Result<()> {
        let line = build_summary_line(summary, reports);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub scenario: String,
    pub tick: u64,
    pub elapsed_secs: u64,
    pub interval_secs: f64,

    pub active_vus: u64,
    pub target_vus: Option<u64>,

    pub requests_per_sec: f64,
    pub requests_per_sec_avg: f64,

    pub total_requests: u64,
    pub failed_requests: u64,
    pub iterations: u64,
    pub checks_failed_total: u64,
    pub total_bytes_received: u64,
    pub total_bytes_sent: u64,

    pub latency_p95_ms: Option<f64>,
}

fn target_vus(progress: &ScenarioProgress) -> Option<u64> {
    match progress {
        ScenarioProgress::ConstantVus { vus, .. } => Some(*vus),
        ScenarioProgress::RampingVus { stage, .. } => stage.as_ref().map(|s| s.current_target),
    }
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        scenario: u.scenario.clone(),
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs(),
        interval_secs: u.interval.as_secs_f64(),

        active_vus: u.metrics.active_vus,
        target_vus: target_vus(&u.progress),

        requests_per_sec: u.metrics.rps_now,
        requests_per_sec_avg: u.metrics.rps_avg,

        total_requests: u.metrics.requests_total,
        failed_requests: u.metrics.failed_requests_total,
        iterations: u.metrics.iterations_total,
        checks_failed_total: u.metrics.checks_failed_total,
        total_bytes_received: u.metrics.bytes_received_total,
        total_bytes_sent: u.metrics.bytes_sent_total,

        latency_p95_ms: u.metrics.latency_p95_ms,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub elapsed_secs: f64,
    pub scenarios: Vec<JsonScenarioSummary>,
    pub totals: JsonTotals,
    pub checks: Vec<JsonCheck>,
    pub thresholds: Vec<JsonThreshold>,
    pub metrics: BTreeMap<String, JsonMetricValue>,
    pub reports: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonScenarioSummary {
    pub scenario: String,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    pub iterations_total: u64,
    pub vus_max: u64,

    pub checks_failed_total: u64,
    pub checks_failed: BTreeMap<String, u64>,

    pub latency: Option<JsonTrend>,
}

/// Milliseconds.
#[derive(Debug, Serialize)]
pub(crate) struct JsonTrend {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub med: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

impl From<&HistogramSummary> for JsonTrend {
    fn from(h: &HistogramSummary) -> Self {
        Self {
            count: h.count,
            min: h.min,
            max: h.max,
            mean: h.mean,
            stdev: h.stdev,
            med: h.med,
            p90: h.p90,
            p95: h.p95,
            p99: h.p99,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub(crate) struct JsonTotals {
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    pub iterations_total: u64,
    pub checks_failed_total: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonCheck {
    pub name: String,
    pub group: Option<String>,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonThreshold {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum JsonMetricValue {
    Counter {
        value: u64,
    },
    Gauge {
        value: i64,
    },
    Rate {
        total: u64,
        hits: u64,
        rate: Option<f64>,
    },
    Trend(JsonTrend),
}

impl From<&MetricValue> for JsonMetricValue {
    fn from(v: &MetricValue) -> Self {
        match v {
            MetricValue::Counter(value) => Self::Counter { value: *value },
            MetricValue::Gauge(value) => Self::Gauge { value: *value },
            MetricValue::Rate { total, hits, rate } => Self::Rate {
                total: *total,
                hits: *hits,
                rate: *rate,
            },
            MetricValue::Trend(h) => Self::Trend(h.into()),
        }
    }
}

fn build_summary_line(summary: &RunSummary, reports: &[PathBuf]) -> JsonSummaryLine {
    let mut totals = JsonTotals::default();
    let scenarios = summary
        .scenarios
        .iter()
        .map(|s| {
            totals.requests_total = totals.requests_total.saturating_add(s.requests_total);
            totals.failed_requests_total = totals
                .failed_requests_total
                .saturating_add(s.failed_requests_total);
            totals.bytes_received_total = totals
                .bytes_received_total
                .saturating_add(s.bytes_received_total);
            totals.bytes_sent_total = totals.bytes_sent_total.saturating_add(s.bytes_sent_total);
            totals.iterations_total = totals.iterations_total.saturating_add(s.iterations_total);
            totals.checks_failed_total = totals
                .checks_failed_total
                .saturating_add(s.checks_failed_total);

            JsonScenarioSummary {
                scenario: s.scenario.clone(),
                requests_total: s.requests_total,
                failed_requests_total: s.failed_requests_total,
                bytes_received_total: s.bytes_received_total,
                bytes_sent_total: s.bytes_sent_total,
                iterations_total: s.iterations_total,
                vus_max: s.vus_max,
                checks_failed_total: s.checks_failed_total,
                checks_failed: s.checks_failed.clone(),
                latency: s.latency.as_ref().map(JsonTrend::from),
            }
        })
        .collect::<Vec<_>>();

    JsonSummaryLine {
        kind: "summary",
        elapsed_secs: summary.elapsed.as_secs_f64(),
        scenarios,
        totals,
        checks: summary
            .checks
            .iter()
            .map(|c| JsonCheck {
                name: c.name.clone(),
                group: c.group.clone(),
                passes: c.passes,
                fails: c.fails,
            })
            .collect(),
        thresholds: summary
            .thresholds
            .iter()
            .map(|t| JsonThreshold {
                metric: t.metric.clone(),
                expression: t.expression.clone(),
                observed: t.observed,
                passed: t.passed,
            })
            .collect(),
        metrics: summary
            .metrics
            .iter()
            .map(|m| (m.name.clone(), JsonMetricValue::from(&m.values)))
            .collect(),
        reports: reports.iter().map(|p| p.display().to_string()).collect(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carga_core::{
        CheckSummary, LiveMetrics, MetricKind, MetricSummary, ScenarioSummary, StageProgress,
        ThresholdResult,
    };
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn progress_line_reports_stage_target() {
        let update = ProgressUpdate {
            tick: 3,
            interval: Duration::from_secs(1),
            elapsed: Duration::from_secs(3),
            scenario: "default".to_string(),
            metrics: LiveMetrics {
                requests_total: 12,
                active_vus: 3,
                rps_now: 4.0,
                ..LiveMetrics::default()
            },
            progress: ScenarioProgress::RampingVus {
                total_duration: Duration::from_secs(20),
                stage: Some(StageProgress {
                    stage: 1,
                    stages: 3,
                    stage_elapsed: Duration::from_secs(3),
                    stage_remaining: Duration::from_secs(2),
                    start_target: 0,
                    end_target: 5,
                    current_target: 3,
                }),
            },
        };

        let v: Value = match serde_json::to_value(build_progress_line(&update)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };
        assert_eq!(v.get("kind").and_then(Value::as_str), Some("progress"));
        assert_eq!(v.get("target_vus").and_then(Value::as_u64), Some(3));
        assert_eq!(v.get("active_vus").and_then(Value::as_u64), Some(3));
        assert_eq!(v.get("total_requests").and_then(Value::as_u64), Some(12));
        assert!(v.get("latency_p95_ms").is_some_and(Value::is_null));
    }

    #[test]
    fn summary_line_has_totals_checks_and_thresholds() {
        let summary = RunSummary {
            elapsed: Duration::from_secs(1),
            scenarios: vec![ScenarioSummary {
                scenario: "default".to_string(),
                requests_total: 10,
                failed_requests_total: 2,
                bytes_received_total: 3,
                bytes_sent_total: 4,
                iterations_total: 5,
                vus_max: 1,
                checks_failed_total: 6,
                checks_failed: [("tem token".to_string(), 6)].into_iter().collect(),
                latency: None,
            }],
            metrics: vec![MetricSummary {
                name: "http_req_failed".to_string(),
                kind: MetricKind::Rate,
                values: MetricValue::Rate {
                    total: 10,
                    hits: 2,
                    rate: Some(0.2),
                },
            }],
            checks: vec![CheckSummary {
                name: "tem token".to_string(),
                group: None,
                passes: 0,
                fails: 6,
            }],
            thresholds: vec![ThresholdResult {
                metric: "http_req_failed".to_string(),
                expression: "rate<0.01".to_string(),
                observed: Some(0.2),
                passed: false,
            }],
        };

        let line = build_summary_line(&summary, &[PathBuf::from("out/relatorio_k6.html")]);
        let v: Value = match serde_json::to_value(&line) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("summary"));
        assert_eq!(
            v.pointer("/totals/requests_total").and_then(Value::as_u64),
            Some(10)
        );
        assert_eq!(
            v.pointer("/scenarios/0/checks_failed/tem token")
                .and_then(Value::as_u64),
            Some(6)
        );
        assert_eq!(
            v.pointer("/checks/0/fails").and_then(Value::as_u64),
            Some(6)
        );
        assert_eq!(
            v.pointer("/thresholds/0/passed").and_then(Value::as_bool),
            Some(false)
        );
        assert_eq!(
            v.pointer("/metrics/http_req_failed/type")
                .and_then(Value::as_str),
            Some("rate")
        );
        assert_eq!(
            v.pointer("/reports/0").and_then(Value::as_str),
            Some("out/relatorio_k6.html")
        );
    }
}

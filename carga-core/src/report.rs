use askama::Template;
use carga_metrics::MetricValue;

use crate::error::Result;
use crate::format::{format_bytes, format_ms, format_opt_ms, format_pct, format_rate};
use crate::summary::RunSummary;

struct ScenarioRow {
    name: String,
    iterations: u64,
    requests: u64,
    failed: u64,
    rps: String,
    vus_max: u64,
    data_received: String,
    data_sent: String,
}

struct ThresholdRow {
    metric: String,
    expression: String,
    observed: String,
    passed: bool,
}

struct CheckRow {
    group: String,
    name: String,
    passes: u64,
    fails: u64,
    pass_rate: String,
    passed: bool,
}

struct TrendRow {
    name: String,
    count: u64,
    avg: String,
    min: String,
    med: String,
    max: String,
    p90: String,
    p95: String,
    p99: String,
}

struct ValueRow {
    name: String,
    kind: String,
    value: String,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    elapsed: String,
    thresholds_passed: bool,
    scenarios: Vec<ScenarioRow>,
    thresholds: Vec<ThresholdRow>,
    checks: Vec<CheckRow>,
    trends: Vec<TrendRow>,
    values: Vec<ValueRow>,
}

/// Renders the run summary as a standalone HTML page.
pub fn html_report(summary: &RunSummary) -> Result<String> {
    let elapsed_secs = summary.elapsed.as_secs_f64().max(1e-9);

    let scenarios = summary
        .scenarios
        .iter()
        .map(|s| ScenarioRow {
            name: s.scenario.clone(),
            iterations: s.iterations_total,
            requests: s.requests_total,
            failed: s.failed_requests_total,
            rps: format_rate(s.requests_total as f64 / elapsed_secs),
            vus_max: s.vus_max,
            data_received: format_bytes(s.bytes_received_total),
            data_sent: format_bytes(s.bytes_sent_total),
        })
        .collect();

    let thresholds = summary
        .thresholds
        .iter()
        .map(|t| ThresholdRow {
            metric: t.metric.clone(),
            expression: t.expression.clone(),
            observed: t
                .observed
                .map_or_else(|| "no data".to_string(), |v| format!("{v:.4}")),
            passed: t.passed,
        })
        .collect();

    let checks = summary
        .checks
        .iter()
        .map(|c| CheckRow {
            group: c.group.clone().unwrap_or_default(),
            name: c.name.clone(),
            passes: c.passes,
            fails: c.fails,
            pass_rate: format_pct(c.pass_rate()),
            passed: c.fails == 0,
        })
        .collect();

    let mut trends = Vec::new();
    let mut values = Vec::new();
    for m in &summary.metrics {
        match &m.values {
            MetricValue::Trend(h) => trends.push(TrendRow {
                name: m.name.clone(),
                count: h.count,
                avg: format_opt_ms(h.mean),
                min: format_opt_ms(h.min),
                med: format_opt_ms(h.med),
                max: format_opt_ms(h.max),
                p90: format_opt_ms(h.p90),
                p95: format_opt_ms(h.p95),
                p99: format_opt_ms(h.p99),
            }),
            MetricValue::Counter(v) => values.push(ValueRow {
                name: m.name.clone(),
                kind: m.kind.to_string(),
                value: if m.name.starts_with("data_") {
                    format_bytes(*v)
                } else {
                    format!("{v} ({}/s)", format_rate(*v as f64 / elapsed_secs))
                },
            }),
            MetricValue::Gauge(v) => values.push(ValueRow {
                name: m.name.clone(),
                kind: m.kind.to_string(),
                value: v.to_string(),
            }),
            MetricValue::Rate { total, hits, rate } => values.push(ValueRow {
                name: m.name.clone(),
                kind: m.kind.to_string(),
                value: format!(
                    "{} ({hits} of {total})",
                    rate.map_or_else(|| "-".to_string(), format_pct)
                ),
            }),
        }
    }

    let page = ReportTemplate {
        elapsed: format_ms(summary.elapsed.as_secs_f64() * 1_000.0),
        thresholds_passed: summary.thresholds_passed(),
        scenarios,
        thresholds,
        checks,
        trends,
        values,
    };
    Ok(page.render()?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use carga_metrics::{HistogramSummary, MetricKind};

    use super::*;
    use crate::summary::{CheckSummary, MetricSummary, ScenarioSummary, ThresholdResult};

    fn summary() -> RunSummary {
        RunSummary {
            elapsed: Duration::from_secs(20),
            scenarios: vec![ScenarioSummary {
                scenario: "default".to_string(),
                requests_total: 120,
                iterations_total: 40,
                vus_max: 5,
                ..ScenarioSummary::default()
            }],
            metrics: vec![
                MetricSummary {
                    name: "login_duration".to_string(),
                    kind: MetricKind::Trend,
                    values: MetricValue::Trend(HistogramSummary {
                        count: 40,
                        p99: Some(412.5),
                        ..HistogramSummary::default()
                    }),
                },
                MetricSummary {
                    name: "http_req_failed".to_string(),
                    kind: MetricKind::Rate,
                    values: MetricValue::Rate {
                        total: 120,
                        hits: 0,
                        rate: Some(0.0),
                    },
                },
            ],
            checks: vec![CheckSummary {
                name: "tem token".to_string(),
                group: Some("Criação de Usuário e Login".to_string()),
                passes: 39,
                fails: 1,
            }],
            thresholds: vec![ThresholdResult {
                metric: "login_duration".to_string(),
                expression: "p(99)<3000".to_string(),
                observed: Some(412.5),
                passed: true,
            }],
        }
    }

    #[test]
    fn report_lists_every_section() {
        let html = html_report(&summary()).unwrap_or_else(|e| panic!("render: {e}"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("login_duration"));
        assert!(html.contains("412.50ms"));
        assert!(html.contains("p(99)&lt;3000"));
        assert!(html.contains("tem token"));
        assert!(html.contains("97.50%"));
        assert!(html.contains("0.00% (0 of 120)"));
    }

    #[test]
    fn report_escapes_names() {
        let mut s = summary();
        s.checks[0].name = "<script>".to_string();
        let html = html_report(&s).unwrap_or_else(|e| panic!("render: {e}"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}

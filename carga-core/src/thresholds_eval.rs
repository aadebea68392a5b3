use carga_metrics::{MetricId, MetricKind, Registry, metrics::percentile_ms};

use crate::error::{Error, Result};
use crate::summary::ThresholdResult;
use crate::thresholds::{ThresholdAgg, ThresholdExpr, ThresholdSet, parse_threshold_expr};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedThreshold {
    pub metric: String,
    pub raw: String,
    pub expr: ThresholdExpr,
}

/// Validates every expression up front so a typo fails before any VU starts.
pub fn parse_threshold_sets(sets: &[ThresholdSet]) -> Result<Vec<ParsedThreshold>> {
    let mut out = Vec::new();
    for set in sets {
        for raw in &set.expressions {
            let expr = parse_threshold_expr(raw).map_err(|error| Error::InvalidThreshold {
                metric: set.metric.clone(),
                error,
            })?;
            out.push(ParsedThreshold {
                metric: set.metric.clone(),
                raw: raw.clone(),
                expr,
            });
        }
    }
    Ok(out)
}

/// Evaluates over all series of each metric. Missing metrics and empty data fail.
pub fn evaluate_thresholds(metrics: &Registry, thresholds: &[ParsedThreshold]) -> Vec<ThresholdResult> {
    thresholds
        .iter()
        .map(|t| {
            let observed = metrics
                .lookup_metric(&t.metric)
                .and_then(|(id, kind)| observed_value(metrics, id, kind, t.expr.agg));
            let passed = observed.is_some_and(|v| t.expr.op.compare(v, t.expr.value));
            ThresholdResult {
                metric: t.metric.clone(),
                expression: t.raw.clone(),
                observed,
                passed,
            }
        })
        .collect()
}

fn observed_value(
    metrics: &Registry,
    metric: MetricId,
    kind: MetricKind,
    agg: ThresholdAgg,
) -> Option<f64> {
    match kind {
        MetricKind::Counter => match agg {
            ThresholdAgg::Count => Some(metrics.query(metric).sum_counter_total() as f64),
            _ => None,
        },
        // Only the peak across gauge series is defined.
        MetricKind::Gauge => match agg {
            ThresholdAgg::Max => metrics.query(metric).max_gauge().map(|v| v as f64),
            _ => None,
        },
        MetricKind::Rate => {
            let (total, hits) = metrics.query(metric).sum_rate_total();
            match agg {
                ThresholdAgg::Count => Some(total as f64),
                ThresholdAgg::Rate => (total > 0).then(|| hits as f64 / total as f64),
                _ => None,
            }
        }
        MetricKind::Trend => {
            let h = metrics.query(metric).merge_histogram()?;
            if h.is_empty() {
                return None;
            }
            match agg {
                ThresholdAgg::Count => Some(h.len() as f64),
                ThresholdAgg::Avg => Some(h.mean() / 1_000.0),
                ThresholdAgg::Min => Some(h.min() as f64 / 1_000.0),
                ThresholdAgg::Max => Some(h.max() as f64 / 1_000.0),
                ThresholdAgg::Med => percentile_ms(&h, 50.0),
                ThresholdAgg::P(p) => percentile_ms(&h, p),
                ThresholdAgg::Rate => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carga_metrics::TagSet;
    use std::time::Duration;

    fn parsed(metric: &str, exprs: &[&str]) -> Vec<ParsedThreshold> {
        parse_threshold_sets(&[ThresholdSet::new(metric, exprs)])
            .unwrap_or_else(|e| panic!("parse: {e}"))
    }

    #[test]
    fn malformed_expression_is_rejected_with_metric_name() {
        let err = parse_threshold_sets(&[ThresholdSet::new("http_req_duration", &["p95<1"])])
            .err()
            .unwrap_or_else(|| panic!("expected error"));
        assert!(err.to_string().contains("http_req_duration"));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn missing_metric_fails_threshold() {
        let metrics = Registry::default();
        let results = evaluate_thresholds(&metrics, &parsed("nope", &["count>0"]));
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert!(results[0].observed.is_none());
    }

    #[test]
    fn rate_uses_hits_over_total() {
        let metrics = Registry::default();
        let id = metrics.register("http_req_failed", MetricKind::Rate);
        if let Some(h) = metrics.get_handle(id, TagSet::default()) {
            for i in 0..100 {
                h.add_rate(i == 0);
            }
        }

        let ok = evaluate_thresholds(&metrics, &parsed("http_req_failed", &["rate<0.02"]));
        assert!(ok[0].passed);
        assert_eq!(ok[0].observed, Some(0.01));

        let strict = evaluate_thresholds(&metrics, &parsed("http_req_failed", &["rate<0.01"]));
        assert!(!strict[0].passed);
    }

    #[test]
    fn gauge_answers_max_only() {
        let metrics = Registry::default();
        let id = metrics.register("vus", MetricKind::Gauge);
        for (scenario, v) in [("a", 3), ("b", 5)] {
            if let Some(h) = metrics.get_handle(id, metrics.resolve_tags(&[("scenario", scenario)])) {
                h.set_gauge(v);
            }
        }

        let results = evaluate_thresholds(&metrics, &parsed("vus", &["max<=5", "avg<10", "min>0", "med<10"]));
        assert!(results[0].passed);
        assert_eq!(results[0].observed, Some(5.0));
        for r in &results[1..] {
            assert!(!r.passed, "{} should not evaluate on a gauge", r.expression);
            assert!(r.observed.is_none());
        }
    }

    #[test]
    fn trend_percentiles_merge_all_series() {
        let metrics = Registry::default();
        let id = metrics.register("login_duration", MetricKind::Trend);
        for (status, ms) in [("200", 100), ("200", 200), ("401", 5_000)] {
            if let Some(h) = metrics.get_handle(id, metrics.resolve_tags(&[("status", status)])) {
                h.record_duration(Duration::from_millis(ms));
            }
        }

        let results = evaluate_thresholds(
            &metrics,
            &parsed("login_duration", &["p(99)<3000", "med<300", "count==3", "max>4000"]),
        );
        let passed: Vec<bool> = results.iter().map(|r| r.passed).collect();
        assert_eq!(passed, vec![false, true, true, true]);
    }

    #[test]
    fn registered_but_empty_trend_fails() {
        let metrics = Registry::default();
        metrics.register("login_duration", MetricKind::Trend);
        let results = evaluate_thresholds(&metrics, &parsed("login_duration", &["p(99)<3000"]));
        assert!(!results[0].passed);
    }
}

use std::collections::BTreeMap;

use carga_metrics::{KeyId, MetricKind, MetricValue, Registry, metrics::summarize_histogram};

use crate::iteration_metrics::IterationMetricIds;
use crate::progress::LiveMetrics;
use crate::request_metrics::RequestMetricIds;
use crate::summary::{CheckSummary, MetricSummary, ScenarioSummary};

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ScenarioSnapshot {
    pub(crate) requests_total: u64,
    pub(crate) failed_requests_total: u64,
    pub(crate) bytes_received_total: u64,
    pub(crate) bytes_sent_total: u64,
    pub(crate) iterations_total: u64,
    pub(crate) checks_failed_total: u64,
}

#[derive(Debug, Clone, Copy)]
struct TagKeys {
    scenario: KeyId,
    status: KeyId,
    name: KeyId,
    group: KeyId,
    fail: KeyId,
}

impl TagKeys {
    fn new(metrics: &Registry) -> Self {
        Self {
            scenario: metrics.resolve_key("scenario"),
            status: metrics.resolve_key("status"),
            name: metrics.resolve_key("name"),
            group: metrics.resolve_key("group"),
            fail: metrics.resolve_key("fail"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MetricComputer {
    request_ids: RequestMetricIds,
    iteration_ids: IterationMetricIds,
    keys: TagKeys,
}

impl MetricComputer {
    pub(crate) fn new(
        metrics: &Registry,
        request_ids: RequestMetricIds,
        iteration_ids: IterationMetricIds,
    ) -> Self {
        Self {
            request_ids,
            iteration_ids,
            keys: TagKeys::new(metrics),
        }
    }

    fn snapshot(&self, metrics: &Registry, scenario: KeyId) -> ScenarioSnapshot {
        let k = self.keys;
        let sum = |id| metrics.query(id).where_eq(k.scenario, scenario).sum_counter_total();

        let (_, failed_requests_total) = metrics
            .query(self.request_ids.http_req_failed)
            .where_eq(k.scenario, scenario)
            .sum_rate_total();

        ScenarioSnapshot {
            requests_total: sum(self.request_ids.http_reqs),
            failed_requests_total,
            bytes_received_total: sum(self.request_ids.data_received),
            bytes_sent_total: sum(self.request_ids.data_sent),
            iterations_total: sum(self.iteration_ids.iterations),
            checks_failed_total: metrics
                .query(self.iteration_ids.checks)
                .where_eq(k.scenario, scenario)
                .where_eq(k.status, k.fail)
                .sum_counter_total(),
        }
    }

    pub(crate) fn compute_live_metrics(
        &self,
        metrics: &Registry,
        scenario: &str,
        prev: Option<ScenarioSnapshot>,
        dt_secs: f64,
        elapsed_secs: f64,
    ) -> (LiveMetrics, ScenarioSnapshot) {
        let scenario_key = metrics.resolve_key(scenario);
        let snap = self.snapshot(metrics, scenario_key);
        let prev = prev.unwrap_or_default();

        let req_delta = snap.requests_total.saturating_sub(prev.requests_total);
        let latency_p95_ms = metrics
            .query(self.request_ids.http_req_duration)
            .where_eq(self.keys.scenario, scenario_key)
            .merge_histogram()
            .and_then(|h| carga_metrics::metrics::percentile_ms(&h, 95.0));
        let active_vus = metrics
            .query(self.iteration_ids.vus)
            .where_eq(self.keys.scenario, scenario_key)
            .max_gauge()
            .unwrap_or(0)
            .max(0) as u64;

        let live = LiveMetrics {
            requests_total: snap.requests_total,
            failed_requests_total: snap.failed_requests_total,
            iterations_total: snap.iterations_total,
            checks_failed_total: snap.checks_failed_total,
            bytes_received_total: snap.bytes_received_total,
            bytes_sent_total: snap.bytes_sent_total,
            rps_now: req_delta as f64 / dt_secs.max(1e-9),
            rps_avg: snap.requests_total as f64 / elapsed_secs.max(1e-9),
            active_vus,
            latency_p95_ms,
        };

        (live, snap)
    }

    pub(crate) fn compute_scenario_summary(&self, metrics: &Registry, scenario: &str) -> ScenarioSummary {
        let k = self.keys;
        let scenario_key = metrics.resolve_key(scenario);
        let snap = self.snapshot(metrics, scenario_key);

        let mut checks_failed: BTreeMap<String, u64> = BTreeMap::new();
        let grouped = metrics
            .query(self.iteration_ids.checks)
            .where_eq(k.scenario, scenario_key)
            .where_eq(k.status, k.fail)
            .group_by([k.name])
            .sum_counter();
        for (tags, v) in grouped {
            let Some(name) = tags.get(k.name).and_then(|id| metrics.resolve_key_id(id)) else {
                continue;
            };
            *checks_failed.entry(name.to_string()).or_default() += v;
        }

        let latency = metrics
            .query(self.request_ids.http_req_duration)
            .where_eq(k.scenario, scenario_key)
            .merge_histogram()
            .map(|h| summarize_histogram(&h));

        let vus_max = metrics
            .query(self.iteration_ids.vus_max)
            .where_eq(k.scenario, scenario_key)
            .max_gauge()
            .unwrap_or(0)
            .max(0) as u64;

        ScenarioSummary {
            scenario: scenario.to_string(),
            requests_total: snap.requests_total,
            failed_requests_total: snap.failed_requests_total,
            bytes_received_total: snap.bytes_received_total,
            bytes_sent_total: snap.bytes_sent_total,
            iterations_total: snap.iterations_total,
            vus_max,
            checks_failed_total: snap.checks_failed_total,
            checks_failed,
            latency,
        }
    }

    /// Pass/fail counts per `(group, name)`, ungrouped checks first.
    pub(crate) fn check_summaries(&self, metrics: &Registry) -> Vec<CheckSummary> {
        let k = self.keys;
        let grouped = metrics
            .query(self.iteration_ids.checks)
            .group_by([k.name, k.group, k.status])
            .sum_counter();

        let resolve = |id: Option<KeyId>| {
            id.and_then(|id| metrics.resolve_key_id(id))
                .map(|s| s.to_string())
        };

        let mut by_check: BTreeMap<(Option<String>, String), (u64, u64)> = BTreeMap::new();
        for (tags, v) in grouped {
            let Some(name) = resolve(tags.get(k.name)) else {
                continue;
            };
            let group = resolve(tags.get(k.group));
            let entry = by_check.entry((group, name)).or_default();
            if tags.get(k.status) == Some(k.fail) {
                entry.1 += v;
            } else {
                entry.0 += v;
            }
        }

        by_check
            .into_iter()
            .map(|((group, name), (passes, fails))| CheckSummary {
                name,
                group,
                passes,
                fails,
            })
            .collect()
    }
}

/// One summary per registered metric with every series merged.
pub(crate) fn metric_summaries(metrics: &Registry) -> Vec<MetricSummary> {
    metrics
        .metrics()
        .into_iter()
        .map(|(id, name, kind)| {
            let q = metrics.query(id);
            let values = match kind {
                MetricKind::Counter => MetricValue::Counter(q.sum_counter_total()),
                MetricKind::Gauge => MetricValue::Gauge(q.max_gauge().unwrap_or(0)),
                MetricKind::Rate => {
                    let (total, hits) = q.sum_rate_total();
                    let rate = (total > 0).then(|| hits as f64 / total as f64);
                    MetricValue::Rate { total, hits, rate }
                }
                MetricKind::Trend => MetricValue::Trend(
                    q.merge_histogram()
                        .map(|h| summarize_histogram(&h))
                        .unwrap_or_default(),
                ),
            };
            MetricSummary { name, kind, values }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_summaries_split_by_group_and_status() {
        let metrics = Registry::default();
        let request_ids = RequestMetricIds::register(&metrics);
        let iteration_ids = IterationMetricIds::register(&metrics);
        let computer = MetricComputer::new(&metrics, request_ids, iteration_ids);

        let base = [("scenario", "default"), ("group", "Login")];
        iteration_ids.record_check(&metrics, "tem token", true, &base);
        iteration_ids.record_check(&metrics, "tem token", false, &base);
        iteration_ids.record_check(&metrics, "tem token", true, &base);
        iteration_ids.record_check(&metrics, "solta", true, &[("scenario", "default")]);

        let checks = computer.check_summaries(&metrics);
        assert_eq!(
            checks,
            vec![
                CheckSummary {
                    name: "solta".to_string(),
                    group: None,
                    passes: 1,
                    fails: 0
                },
                CheckSummary {
                    name: "tem token".to_string(),
                    group: Some("Login".to_string()),
                    passes: 2,
                    fails: 1
                },
            ]
        );

        let summary = computer.compute_scenario_summary(&metrics, "default");
        assert_eq!(summary.checks_failed_total, 1);
        assert_eq!(summary.checks_failed.get("tem token"), Some(&1));
    }

    #[test]
    fn metric_summaries_merge_series() {
        let metrics = Registry::default();
        let ids = RequestMetricIds::register(&metrics);
        for status in [200u16, 201, 500] {
            ids.record_request(
                &metrics,
                crate::request_metrics::RequestSample {
                    method: "POST",
                    url: "http://x/usuarios",
                    status,
                    error_kind: None,
                    duration: std::time::Duration::from_millis(5),
                    bytes_sent: 1,
                    bytes_received: 2,
                },
                &[("scenario", "default")],
            );
        }

        let all = metric_summaries(&metrics);
        let reqs = all
            .iter()
            .find(|m| m.name == "http_reqs")
            .unwrap_or_else(|| panic!("http_reqs missing"));
        assert!(matches!(reqs.values, MetricValue::Counter(3)));

        let failed = all
            .iter()
            .find(|m| m.name == "http_req_failed")
            .unwrap_or_else(|| panic!("http_req_failed missing"));
        assert!(matches!(
            failed.values,
            MetricValue::Rate {
                total: 3,
                hits: 1,
                ..
            }
        ));
    }
}

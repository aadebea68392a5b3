use std::time::Duration;

use carga_metrics::{MetricId, MetricKind, Registry};

#[derive(Debug, Clone, Copy)]
pub struct IterationMetricIds {
    pub iterations: MetricId,
    pub iteration_duration: MetricId,
    pub group_duration: MetricId,
    /// Counter tagged `name` and `status=pass|fail`.
    pub checks: MetricId,
    /// Active VUs right now.
    pub vus: MetricId,
    /// Peak of `vus` over the run.
    pub vus_max: MetricId,
}

impl IterationMetricIds {
    pub fn register(metrics: &Registry) -> Self {
        Self {
            iterations: metrics.register("iterations", MetricKind::Counter),
            iteration_duration: metrics.register("iteration_duration", MetricKind::Trend),
            group_duration: metrics.register("group_duration", MetricKind::Trend),
            checks: metrics.register("checks", MetricKind::Counter),
            vus: metrics.register("vus", MetricKind::Gauge),
            vus_max: metrics.register("vus_max", MetricKind::Gauge),
        }
    }

    pub fn record_iteration(&self, metrics: &Registry, duration: Duration, base_tags: &[(&str, &str)]) {
        let tags = metrics.resolve_tags(base_tags);
        if let Some(h) = metrics.get_handle(self.iterations, tags.clone()) {
            h.increment(1);
        }
        if let Some(h) = metrics.get_handle(self.iteration_duration, tags) {
            h.record_duration(duration);
        }
    }

    /// `base_tags` must already carry the `group` tag.
    pub fn record_group(&self, metrics: &Registry, duration: Duration, base_tags: &[(&str, &str)]) {
        if let Some(h) = metrics.get_handle(self.group_duration, metrics.resolve_tags(base_tags)) {
            h.record_duration(duration);
        }
    }

    pub fn record_check(
        &self,
        metrics: &Registry,
        name: &str,
        passed: bool,
        base_tags: &[(&str, &str)],
    ) {
        let status = if passed { "pass" } else { "fail" };
        let mut tags: Vec<(&str, &str)> = Vec::with_capacity(base_tags.len() + 2);
        tags.extend_from_slice(base_tags);
        tags.push(("name", name));
        tags.push(("status", status));

        if let Some(h) = metrics.get_handle(self.checks, metrics.resolve_tags(&tags)) {
            h.increment(1);
        }
    }
}

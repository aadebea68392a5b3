use std::time::Duration;

use carga_metrics::{MetricId, MetricKind, Registry};

/// Built-in HTTP metrics, named as k6 names them.
#[derive(Debug, Clone, Copy)]
pub struct RequestMetricIds {
    pub http_reqs: MetricId,
    pub http_req_duration: MetricId,
    /// Rate of requests that failed at transport level or got a status outside `200..=399`.
    pub http_req_failed: MetricId,
    pub http_req_errors: MetricId,
    pub data_sent: MetricId,
    pub data_received: MetricId,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestSample<'a> {
    pub method: &'a str,
    pub url: &'a str,
    /// 0 when no response arrived.
    pub status: u16,
    pub error_kind: Option<&'a str>,
    pub duration: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl RequestSample<'_> {
    pub fn failed(&self) -> bool {
        self.error_kind.is_some() || !(200..400).contains(&self.status)
    }
}

impl RequestMetricIds {
    pub fn register(metrics: &Registry) -> Self {
        Self {
            http_reqs: metrics.register("http_reqs", MetricKind::Counter),
            http_req_duration: metrics.register("http_req_duration", MetricKind::Trend),
            http_req_failed: metrics.register("http_req_failed", MetricKind::Rate),
            http_req_errors: metrics.register("http_req_errors", MetricKind::Counter),
            data_sent: metrics.register("data_sent", MetricKind::Counter),
            data_received: metrics.register("data_received", MetricKind::Counter),
        }
    }

    /// `base_tags` carries scenario (and group); request tags are appended.
    pub fn record_request(
        &self,
        metrics: &Registry,
        sample: RequestSample<'_>,
        base_tags: &[(&str, &str)],
    ) {
        let status = sample.status.to_string();

        let mut tags: Vec<(&str, &str)> = Vec::with_capacity(base_tags.len() + 4);
        tags.extend_from_slice(base_tags);
        tags.push(("method", sample.method));
        tags.push(("status", status.as_str()));
        tags.push(("url", sample.url));
        let request_tags = metrics.resolve_tags(&tags);

        if let Some(h) = metrics.get_handle(self.http_reqs, request_tags.clone()) {
            h.increment(1);
        }
        if let Some(h) = metrics.get_handle(self.http_req_duration, request_tags.clone()) {
            h.record_duration(sample.duration);
        }
        if let Some(h) = metrics.get_handle(self.http_req_failed, request_tags) {
            h.add_rate(sample.failed());
        }

        let plain_tags = metrics.resolve_tags(base_tags);
        if let Some(h) = metrics.get_handle(self.data_sent, plain_tags.clone()) {
            h.increment(sample.bytes_sent);
        }
        if let Some(h) = metrics.get_handle(self.data_received, plain_tags) {
            h.increment(sample.bytes_received);
        }

        if let Some(kind) = sample.error_kind {
            let mut tags: Vec<(&str, &str)> = Vec::with_capacity(base_tags.len() + 1);
            tags.extend_from_slice(base_tags);
            tags.push(("error", kind));
            if let Some(h) = metrics.get_handle(self.http_req_errors, metrics.resolve_tags(&tags)) {
                h.increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: u16, error_kind: Option<&'static str>) -> RequestSample<'static> {
        RequestSample {
            method: "POST",
            url: "http://localhost/login",
            status,
            error_kind,
            duration: Duration::from_millis(12),
            bytes_sent: 100,
            bytes_received: 50,
        }
    }

    #[test]
    fn failed_covers_transport_errors_and_bad_statuses() {
        assert!(!sample(200, None).failed());
        assert!(!sample(399, None).failed());
        assert!(sample(400, None).failed());
        assert!(sample(500, None).failed());
        assert!(sample(0, Some("timeout")).failed());
    }

    #[test]
    fn record_request_feeds_all_builtins() {
        let metrics = Registry::default();
        let ids = RequestMetricIds::register(&metrics);
        let base = [("scenario", "default")];

        ids.record_request(&metrics, sample(201, None), &base);
        ids.record_request(&metrics, sample(500, None), &base);
        ids.record_request(&metrics, sample(0, Some("connect")), &base);

        assert_eq!(metrics.query(ids.http_reqs).sum_counter_total(), 3);
        assert_eq!(metrics.query(ids.http_req_failed).sum_rate_total(), (3, 2));
        assert_eq!(metrics.query(ids.http_req_errors).sum_counter_total(), 1);
        assert_eq!(metrics.query(ids.data_sent).sum_counter_total(), 300);
        assert_eq!(metrics.query(ids.data_received).sum_counter_total(), 150);

        let durations = metrics
            .query(ids.http_req_duration)
            .merge_histogram()
            .unwrap_or_else(|| panic!("expected durations"));
        assert_eq!(durations.len(), 3);
    }
}

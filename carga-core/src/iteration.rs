use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use carga_http::{Headers, HttpRequest, HttpResponse};
use carga_metrics::MetricKind;
use serde::Serialize;

use crate::metrics_context::MetricsContext;
use crate::request_metrics::RequestSample;
use crate::run::RunContext;

/// Per-VU handle passed to every iteration: HTTP, checks, groups, sleeps and custom metrics.
#[derive(Debug)]
pub struct Iteration {
    run_ctx: Arc<RunContext>,
    metrics_ctx: MetricsContext,
    vu_id: u64,
    index: u64,
    group: Option<String>,
}

impl Iteration {
    pub fn new(run_ctx: Arc<RunContext>, metrics_ctx: MetricsContext, vu_id: u64) -> Self {
        Self {
            run_ctx,
            metrics_ctx,
            vu_id,
            index: 0,
            group: None,
        }
    }

    pub(crate) fn begin(&mut self) {
        self.index = self.index.saturating_add(1);
        self.group = None;
    }

    pub fn vu_id(&self) -> u64 {
        self.vu_id
    }

    /// 1-based count of iterations this VU has started.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn scenario(&self) -> &str {
        self.metrics_ctx.scenario()
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.run_ctx.env_var(key)
    }

    pub fn current_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn base_tags(&self) -> Vec<(&str, &str)> {
        self.metrics_ctx.base_tags(self.group.as_deref())
    }

    /// Sends a request and records the built-in HTTP metrics. Transport failures come back
    /// as a status-0 response with `error` set.
    pub async fn request(&self, req: HttpRequest) -> HttpResponse {
        let method = req.method.to_string();
        let url = req.url.clone();

        let started = Instant::now();
        let res = match self.run_ctx.client.request(req).await {
            Ok(res) => res,
            Err(err) => {
                tracing::warn!(%method, %url, error = %err, "http request failed");
                HttpResponse::transport_failure(err.transport_error_kind(), started.elapsed())
            }
        };

        self.record_response(&method, &url, &res);
        res
    }

    /// `POST` with a JSON body. `headers` replace the default `content-type` when they set one.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: Headers,
    ) -> HttpResponse {
        match HttpRequest::post_json(url, body) {
            Ok(req) => self.request(req.headers(headers)).await,
            Err(err) => {
                tracing::warn!(%url, error = %err, "failed to encode request body");
                let res = HttpResponse::transport_failure(err.transport_error_kind(), Duration::ZERO);
                self.record_response("POST", url, &res);
                res
            }
        }
    }

    fn record_response(&self, method: &str, url: &str, res: &HttpResponse) {
        let error_kind = res.error.map(|k| k.to_string());
        let sample = RequestSample {
            method,
            url,
            status: res.status,
            error_kind: error_kind.as_deref(),
            duration: res.duration,
            bytes_sent: res.bytes_sent,
            bytes_received: res.bytes_received,
        };
        if sample.failed() {
            tracing::debug!(method, url, status = res.status, "request failed");
        }

        self.run_ctx
            .request_metrics
            .record_request(&self.run_ctx.metrics, sample, &self.base_tags());
    }

    /// Runs every named predicate against `value`, records each outcome, and returns whether
    /// all passed. A failing check never stops the iteration.
    pub fn check<T: ?Sized>(&self, value: &T, checks: &[(&str, &dyn Fn(&T) -> bool)]) -> bool {
        let tags = self.base_tags();
        let mut all_passed = true;
        for (name, predicate) in checks {
            let passed = predicate(value);
            all_passed &= passed;
            self.run_ctx.iteration_metrics.record_check(
                &self.run_ctx.metrics,
                name,
                passed,
                &tags,
            );
        }
        all_passed
    }

    /// Enters a named group until the guard drops. Nested groups are joined with `::`.
    pub fn group(&mut self, name: &str) -> GroupGuard<'_> {
        let next = match self.group.as_deref() {
            Some(parent) => format!("{parent}::{name}"),
            None => name.to_string(),
        };
        let prev = self.group.replace(next);
        GroupGuard {
            it: self,
            prev,
            started: Instant::now(),
        }
    }

    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub fn trend(&self, name: &str, duration: Duration) {
        if let Some(h) = self.custom_handle(name, MetricKind::Trend) {
            h.record_duration(duration);
        }
    }

    pub fn counter(&self, name: &str, value: u64) {
        if let Some(h) = self.custom_handle(name, MetricKind::Counter) {
            h.increment(value);
        }
    }

    pub fn rate(&self, name: &str, hit: bool) {
        if let Some(h) = self.custom_handle(name, MetricKind::Rate) {
            h.add_rate(hit);
        }
    }

    pub fn gauge(&self, name: &str, value: i64) {
        if let Some(h) = self.custom_handle(name, MetricKind::Gauge) {
            h.set_gauge(value);
        }
    }

    fn custom_handle(&self, name: &str, kind: MetricKind) -> Option<carga_metrics::MetricHandle> {
        let metrics = &self.run_ctx.metrics;
        let id = metrics.register(name, kind);
        metrics.get_handle(id, metrics.resolve_tags(&self.base_tags()))
    }
}

/// Active group scope. Records `group_duration` and restores the outer group on drop.
#[derive(Debug)]
pub struct GroupGuard<'a> {
    it: &'a mut Iteration,
    prev: Option<String>,
    started: Instant,
}

impl Deref for GroupGuard<'_> {
    type Target = Iteration;

    fn deref(&self) -> &Iteration {
        self.it
    }
}

impl DerefMut for GroupGuard<'_> {
    fn deref_mut(&mut self) -> &mut Iteration {
        self.it
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        {
            let it = &*self.it;
            it.run_ctx.iteration_metrics.record_group(
                &it.run_ctx.metrics,
                elapsed,
                &it.base_tags(),
            );
        }
        self.it.group = self.prev.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carga_metrics::Registry;

    fn iteration() -> Iteration {
        let ctx = RunContext::new(Arc::from([]), &[]).unwrap_or_else(|e| panic!("ctx: {e}"));
        Iteration::new(Arc::new(ctx), MetricsContext::new("default"), 1)
    }

    fn count(metrics: &Registry, name: &str, tags: &[(&str, &str)]) -> u64 {
        let Some((id, _)) = metrics.lookup_metric(name) else {
            return 0;
        };
        let mut q = metrics.query(id);
        for (k, v) in tags {
            q = q.where_eq(metrics.resolve_key(k), metrics.resolve_key(v));
        }
        q.sum_counter_total()
    }

    #[test]
    fn check_records_each_predicate_and_returns_all_passed() {
        let it = iteration();
        let status = 201u16;

        let is_created = |s: &u16| *s == 201;
        let is_ok = |s: &u16| *s == 200;
        let all = it.check(
            &status,
            &[("usuario criado", &is_created), ("login", &is_ok)],
        );
        assert!(!all);

        let metrics = &it.run_ctx.metrics;
        assert_eq!(count(metrics, "checks", &[("name", "usuario criado"), ("status", "pass")]), 1);
        assert_eq!(count(metrics, "checks", &[("name", "login"), ("status", "fail")]), 1);
    }

    #[test]
    fn groups_tag_metrics_nest_and_restore() {
        let mut it = iteration();
        {
            let mut outer = it.group("Login");
            assert_eq!(outer.current_group(), Some("Login"));
            {
                let inner = outer.group("Token");
                assert_eq!(inner.current_group(), Some("Login::Token"));
                inner.counter("tokens", 1);
            }
            assert_eq!(outer.current_group(), Some("Login"));
            let pass = |_: &()| true;
            outer.check(&(), &[("inside", &pass)]);
        }
        assert_eq!(it.current_group(), None);

        let metrics = &it.run_ctx.metrics;
        assert_eq!(count(metrics, "tokens", &[("group", "Login::Token")]), 1);
        assert_eq!(count(metrics, "checks", &[("group", "Login"), ("name", "inside")]), 1);

        let (group_duration, _) = metrics
            .lookup_metric("group_duration")
            .unwrap_or_else(|| panic!("group_duration not registered"));
        let recorded = metrics
            .query(group_duration)
            .merge_histogram()
            .map(|h| h.len())
            .unwrap_or_default();
        assert_eq!(recorded, 2);
    }

    #[test]
    fn custom_rate_gauge_and_env() {
        let env: crate::run::EnvVars = Arc::from(vec![(
            Arc::<str>::from("URL_BASE"),
            Arc::<str>::from("http://localhost:3000"),
        )]);
        let ctx = RunContext::new(env, &[]).unwrap_or_else(|e| panic!("ctx: {e}"));
        let mut it = Iteration::new(Arc::new(ctx), MetricsContext::new("default"), 1);
        assert_eq!(it.env("URL_BASE"), Some("http://localhost:3000"));
        assert_eq!(it.env("MISSING"), None);

        it.rate("token_ok", true);
        it.rate("token_ok", false);
        {
            let grouped = it.group("Produtos");
            grouped.rate("token_ok", false);
            grouped.gauge("queue_depth", 7);
        }

        let metrics = &it.run_ctx.metrics;
        let (rate, _) = metrics
            .lookup_metric("token_ok")
            .unwrap_or_else(|| panic!("token_ok not registered"));
        assert_eq!(metrics.query(rate).sum_rate_total(), (3, 1));
        let in_group = metrics
            .query(rate)
            .where_has(metrics.resolve_key("group"))
            .sum_rate_total();
        assert_eq!(in_group, (1, 0));

        let (gauge, kind) = metrics
            .lookup_metric("queue_depth")
            .unwrap_or_else(|| panic!("queue_depth not registered"));
        assert_eq!(kind, MetricKind::Gauge);
        assert_eq!(metrics.query(gauge).max_gauge(), Some(7));
    }

    #[tokio::test]
    async fn transport_failure_is_a_failed_request_not_a_panic() {
        let it = iteration();
        let res = it
            .post_json("http://127.0.0.1:1/login", &serde_json::json!({}), Vec::new())
            .await;
        assert_eq!(res.status, 0);
        assert!(res.error.is_some());

        let metrics = &it.run_ctx.metrics;
        assert_eq!(count(metrics, "http_reqs", &[("status", "0")]), 1);
        assert_eq!(count(metrics, "http_req_errors", &[]), 1);
        let failed = metrics
            .query(it.run_ctx.request_metrics.http_req_failed)
            .sum_rate_total();
        assert_eq!(failed, (1, 1));
    }
}

use std::collections::BTreeMap;
use std::fmt::Write as _;

use carga_core::format::{format_bytes, format_opt_ms, format_pct, format_rate};
use carga_core::{
    CheckSummary, HistogramSummary, MetricSummary, MetricValue, RunSummary, ScenarioSummary,
    ThresholdResult,
};

pub(crate) fn render(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.scenarios.is_empty() {
        out.push_str("summary: no scenarios\n");
        return out;
    }

    out.push_str("summary\n");

    let mut totals = Totals::default();
    for s in &summary.scenarios {
        totals.add(s);
        render_scenario(s, &mut out);
        out.push('\n');
    }

    out.push_str("totals\n");
    writeln!(
        &mut out,
        "  requests: {} (failed {})",
        totals.requests_total, totals.failed_requests_total
    )
    .ok();
    writeln!(&mut out, "  iterations: {}", totals.iterations_total).ok();
    writeln!(
        &mut out,
        "  bytes: recv {} sent {}",
        format_bytes(totals.bytes_received_total),
        format_bytes(totals.bytes_sent_total)
    )
    .ok();

    if !summary.elapsed.is_zero() {
        let secs = summary.elapsed.as_secs_f64();
        let rps = (totals.requests_total as f64) / secs;
        let iters = (totals.iterations_total as f64) / secs;
        writeln!(
            &mut out,
            "  rates: rps={} iters/s={} elapsed={:.1}s",
            format_rate(rps),
            format_rate(iters),
            secs
        )
        .ok();
    }
    writeln!(
        &mut out,
        "  checks_failed_total: {}",
        totals.checks_failed_total
    )
    .ok();

    render_checks(&summary.checks, &mut out);
    render_thresholds(&summary.thresholds, &mut out);
    render_metrics(&summary.metrics, &mut out);

    out
}

fn render_scenario(s: &ScenarioSummary, out: &mut String) {
    writeln!(out, "scenario: {}", s.scenario).ok();
    writeln!(
        out,
        "  requests: {} (failed {})",
        s.requests_total, s.failed_requests_total
    )
    .ok();
    writeln!(out, "  iterations: {}", s.iterations_total).ok();
    writeln!(out, "  vus_max: {}", s.vus_max).ok();
    writeln!(
        out,
        "  bytes: recv {} sent {}",
        format_bytes(s.bytes_received_total),
        format_bytes(s.bytes_sent_total)
    )
    .ok();

    if s.checks_failed_total > 0 {
        writeln!(out, "  checks_failed_total: {}", s.checks_failed_total).ok();

        let mut checks: Vec<_> = s.checks_failed.iter().collect();
        checks.sort_by(|(a_name, a_count), (b_name, b_count)| {
            b_count
                .cmp(a_count)
                .then_with(|| a_name.as_str().cmp(b_name.as_str()))
        });

        for (name, count) in checks {
            writeln!(out, "    {name}: {count}").ok();
        }
    }

    match &s.latency {
        Some(h) if h.count > 0 => {
            writeln!(out, "  latency = {}", trend_line(h)).ok();
        }
        _ => out.push_str("  latency: n/a\n"),
    }
}

fn trend_line(h: &HistogramSummary) -> String {
    format!(
        "med={} p90={} p95={} p99={} mean={} max={} (n={})",
        format_opt_ms(h.med),
        format_opt_ms(h.p90),
        format_opt_ms(h.p95),
        format_opt_ms(h.p99),
        format_opt_ms(h.mean),
        format_opt_ms(h.max),
        h.count
    )
}

#[derive(Default)]
struct Totals {
    requests_total: u64,
    failed_requests_total: u64,
    bytes_received_total: u64,
    bytes_sent_total: u64,
    iterations_total: u64,
    checks_failed_total: u64,
}

impl Totals {
    fn add(&mut self, s: &ScenarioSummary) {
        self.requests_total = self.requests_total.saturating_add(s.requests_total);
        self.failed_requests_total = self
            .failed_requests_total
            .saturating_add(s.failed_requests_total);
        self.bytes_received_total = self
            .bytes_received_total
            .saturating_add(s.bytes_received_total);
        self.bytes_sent_total = self.bytes_sent_total.saturating_add(s.bytes_sent_total);
        self.iterations_total = self.iterations_total.saturating_add(s.iterations_total);
        self.checks_failed_total = self
            .checks_failed_total
            .saturating_add(s.checks_failed_total);
    }
}

fn render_checks(checks: &[CheckSummary], out: &mut String) {
    if checks.is_empty() {
        return;
    }

    out.push_str("\nchecks\n");

    let mut by_group: BTreeMap<Option<&str>, Vec<&CheckSummary>> = BTreeMap::new();
    for c in checks {
        by_group.entry(c.group.as_deref()).or_default().push(c);
    }

    for (group, rows) in by_group {
        writeln!(out, "  group: {}", group.unwrap_or("-")).ok();
        for c in rows {
            let status = if c.fails > 0 { "FAIL" } else { "OK" };
            writeln!(
                out,
                "    {}: pass={} fail={} ({}) [{status}]",
                c.name,
                c.passes,
                c.fails,
                format_pct(c.pass_rate())
            )
            .ok();
        }
    }
}

fn render_thresholds(thresholds: &[ThresholdResult], out: &mut String) {
    if thresholds.is_empty() {
        return;
    }

    out.push_str("\nthresholds\n");
    for t in thresholds {
        let observed = t
            .observed
            .map_or_else(|| "-".to_string(), |o| format!("{o:.4}"));
        let status = if t.passed { "OK" } else { "FAIL" };
        writeln!(
            out,
            "  {}: {} observed={observed} [{status}]",
            t.metric, t.expression
        )
        .ok();
    }
}

fn render_metrics(metrics: &[MetricSummary], out: &mut String) {
    if metrics.is_empty() {
        return;
    }

    out.push_str("\nmetrics\n");

    let mut rows: Vec<&MetricSummary> = metrics.iter().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    for m in rows {
        let value = match &m.values {
            MetricValue::Counter(v) => v.to_string(),
            MetricValue::Gauge(v) => v.to_string(),
            MetricValue::Rate { total, hits, rate } => format!(
                "{} ({hits}/{total})",
                rate.map_or_else(|| "-".to_string(), format_pct)
            ),
            MetricValue::Trend(h) => trend_line(h),
        };
        writeln!(out, "  {} = {value}", m.name).ok();
    }
}

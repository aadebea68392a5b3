use std::collections::HashMap;
use std::sync::atomic::Ordering;

use hdrhistogram::Histogram;
use smallvec::SmallVec;

use crate::key::KeyId;
use crate::metrics::{HistogramSummary, MetricStorage, new_trend_histogram, summarize_histogram};
use crate::registry::{MetricId, Registry};
use crate::tags::TagSet;

#[derive(Debug, Clone, Copy)]
enum TagFilter {
    Eq(KeyId, KeyId),
    Has(KeyId),
    Missing(KeyId),
}

impl TagFilter {
    fn matches(&self, tags: &TagSet) -> bool {
        match *self {
            TagFilter::Eq(k, v) => tags.get(k) == Some(v),
            TagFilter::Has(k) => tags.get(k).is_some(),
            TagFilter::Missing(k) => tags.get(k).is_none(),
        }
    }
}

/// Filtered, optionally grouped view over the series of one metric.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    registry: &'a Registry,
    metric: MetricId,
    filters: SmallVec<[TagFilter; 4]>,
    group_keys: SmallVec<[KeyId; 4]>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(registry: &'a Registry, metric: MetricId) -> Self {
        Self {
            registry,
            metric,
            filters: SmallVec::new(),
            group_keys: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn where_eq(mut self, key: KeyId, value: KeyId) -> Self {
        self.filters.push(TagFilter::Eq(key, value));
        self
    }

    #[must_use]
    pub fn where_has(mut self, key: KeyId) -> Self {
        self.filters.push(TagFilter::Has(key));
        self
    }

    #[must_use]
    pub fn where_missing(mut self, key: KeyId) -> Self {
        self.filters.push(TagFilter::Missing(key));
        self
    }

    #[must_use]
    pub fn group_by(mut self, keys: impl IntoIterator<Item = KeyId>) -> Self {
        self.group_keys = keys.into_iter().collect();
        self.group_keys.sort_unstable();
        self.group_keys.dedup();
        self
    }

    fn matches(&self, tags: &TagSet) -> bool {
        self.filters.iter().all(|f| f.matches(tags))
    }

    fn group_key(&self, tags: &TagSet) -> TagSet {
        tags.project(&self.group_keys)
    }

    pub fn sum_counter(self) -> HashMap<TagSet, u64> {
        let mut out: HashMap<TagSet, u64> = HashMap::new();

        self.registry.visit_series(self.metric, |tags, storage| {
            if !self.matches(tags) {
                return;
            }
            let MetricStorage::Counter(c) = storage else {
                return;
            };

            let v = c.load(Ordering::Relaxed);
            let k = self.group_key(tags);
            let cur = out.entry(k).or_default();
            *cur = cur.saturating_add(v);
        });

        out
    }

    pub fn sum_counter_total(self) -> u64 {
        self.sum_counter().values().copied().sum()
    }

    /// `(total, hits)` per group.
    pub fn sum_rate(self) -> HashMap<TagSet, (u64, u64)> {
        let mut out: HashMap<TagSet, (u64, u64)> = HashMap::new();

        self.registry.visit_series(self.metric, |tags, storage| {
            if !self.matches(tags) {
                return;
            }
            let MetricStorage::Rate(r) = storage else {
                return;
            };

            let (total, hits) = r.snapshot();
            let cur = out.entry(self.group_key(tags)).or_default();
            cur.0 = cur.0.saturating_add(total);
            cur.1 = cur.1.saturating_add(hits);
        });

        out
    }

    pub fn sum_rate_total(self) -> (u64, u64) {
        self.sum_rate()
            .values()
            .fold((0, 0), |(t, h), (dt, dh)| (t + dt, h + dh))
    }

    /// Largest gauge value across matching series.
    pub fn max_gauge(self) -> Option<i64> {
        let mut out: Option<i64> = None;
        self.registry.visit_series(self.metric, |tags, storage| {
            if !self.matches(tags) {
                return;
            }
            if let MetricStorage::Gauge(g) = storage {
                let v = g.load(Ordering::Relaxed);
                out = Some(out.map_or(v, |cur| cur.max(v)));
            }
        });
        out
    }

    pub fn merge_histograms(self) -> HashMap<TagSet, Histogram<u64>> {
        let mut acc: HashMap<TagSet, Histogram<u64>> = HashMap::new();

        self.registry.visit_series(self.metric, |tags, storage| {
            if !self.matches(tags) {
                return;
            }
            let MetricStorage::Trend(h) = storage else {
                return;
            };

            let entry = acc
                .entry(self.group_key(tags))
                .or_insert_with(new_trend_histogram);
            let h = h.lock();
            // Auto-resizing target; adding cannot go out of range.
            let _ = entry.add(&*h);
        });

        acc
    }

    /// All matching series merged into one histogram, ignoring `group_by`.
    pub fn merge_histogram(self) -> Option<Histogram<u64>> {
        let mut merged: Option<Histogram<u64>> = None;
        for h in self.merge_histograms().into_values() {
            match merged.as_mut() {
                Some(m) => {
                    let _ = m.add(&h);
                }
                None => merged = Some(h),
            }
        }
        merged
    }

    pub fn merge_histogram_summary(self) -> HashMap<TagSet, HistogramSummary> {
        self.merge_histograms()
            .into_iter()
            .map(|(k, h)| (k, summarize_histogram(&h)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKind;

    #[test]
    fn sum_counter_groups_and_filters() {
        let reg = Registry::default();
        let metric = reg.register("checks", MetricKind::Counter);

        let name_k = reg.resolve_key("name");
        let status_k = reg.resolve_key("status");
        let pass = reg.resolve_key("pass");

        for (name, status, n) in [("login", "pass", 4), ("login", "fail", 1), ("token", "pass", 2)]
        {
            let tags = reg.resolve_tags(&[("name", name), ("status", status)]);
            if let Some(h) = reg.get_handle(metric, tags) {
                h.increment(n);
            }
        }

        let by_name = reg
            .query(metric)
            .where_eq(status_k, pass)
            .group_by([name_k])
            .sum_counter();
        assert_eq!(by_name.len(), 2);
        assert_eq!(by_name.values().copied().sum::<u64>(), 6);

        assert_eq!(reg.query(metric).sum_counter_total(), 7);
    }

    #[test]
    fn sum_rate_adds_totals_and_hits() {
        let reg = Registry::default();
        let metric = reg.register("http_req_failed", MetricKind::Rate);
        for (status, hit) in [("200", false), ("500", true), ("200", false)] {
            let tags = reg.resolve_tags(&[("status", status)]);
            if let Some(h) = reg.get_handle(metric, tags) {
                h.add_rate(hit);
            }
        }
        assert_eq!(reg.query(metric).sum_rate_total(), (3, 1));
    }

    #[test]
    fn merge_histogram_respects_missing_tag_filter() {
        let reg = Registry::default();
        let metric = reg.register("group_duration", MetricKind::Trend);
        let group_k = reg.resolve_key("group");

        if let Some(h) = reg.get_handle(metric, reg.resolve_tags(&[("scenario", "default")])) {
            h.record_micros(10_000);
            h.record_micros(20_000);
        }
        if let Some(h) = reg.get_handle(
            metric,
            reg.resolve_tags(&[("scenario", "default"), ("group", "login")]),
        ) {
            h.record_micros(999_000);
        }

        let merged = reg
            .query(metric)
            .where_missing(group_k)
            .merge_histogram()
            .unwrap_or_else(|| panic!("expected histogram"));
        let summary = summarize_histogram(&merged);
        assert_eq!(summary.count, 2);
        let max = summary.max.unwrap_or_default();
        assert!((max - 20.0).abs() < 0.1, "max={max}");

        let all = reg
            .query(metric)
            .merge_histogram()
            .unwrap_or_else(|| panic!("expected histogram"));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn max_gauge_over_series() {
        let reg = Registry::default();
        let metric = reg.register("vus_max", MetricKind::Gauge);
        assert_eq!(reg.query(metric).max_gauge(), None);
        if let Some(h) = reg.get_handle(metric, TagSet::default()) {
            h.max_gauge(4);
        }
        assert_eq!(reg.query(metric).max_gauge(), Some(4));
    }
}

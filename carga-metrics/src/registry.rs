use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::key::{Interner, KeyId};
use crate::metrics::{MetricHandle, MetricKind, MetricSeriesSummary, MetricStorage};
use crate::query::Query;
use crate::tags::TagSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(u32);

#[derive(Debug)]
struct MetricDef {
    name: KeyId,
    kind: MetricKind,
}

#[derive(Debug, Default)]
pub struct Registry {
    interner: Interner,
    defs: RwLock<Vec<MetricDef>>,
    storage: DashMap<MetricId, DashMap<TagSet, MetricStorage>>,
}

impl Registry {
    /// Registering an existing name returns its id; the first kind wins.
    pub fn register(&self, name: &str, kind: MetricKind) -> MetricId {
        let name_id = self.interner.get_or_intern(name);

        let mut defs = self.defs.write();
        if let Some(idx) = defs.iter().position(|d| d.name == name_id) {
            return MetricId(idx as u32);
        }

        let id = MetricId(u32::try_from(defs.len()).unwrap_or(u32::MAX));
        defs.push(MetricDef {
            name: name_id,
            kind,
        });
        self.storage.insert(id, DashMap::new());
        id
    }

    pub fn lookup_metric(&self, name: &str) -> Option<(MetricId, MetricKind)> {
        let name_id = self.interner.get_or_intern(name);
        let defs = self.defs.read();
        defs.iter()
            .position(|d| d.name == name_id)
            .map(|idx| (MetricId(idx as u32), defs[idx].kind))
    }

    /// Registered metrics in registration order.
    pub fn metrics(&self) -> Vec<(MetricId, String, MetricKind)> {
        self.defs
            .read()
            .iter()
            .enumerate()
            .map(|(idx, d)| {
                let name = self
                    .interner
                    .resolve(d.name)
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                (MetricId(idx as u32), name, d.kind)
            })
            .collect()
    }

    pub fn metric_kind(&self, metric: MetricId) -> Option<MetricKind> {
        self.defs.read().get(metric.0 as usize).map(|d| d.kind)
    }

    pub fn resolve_key(&self, key: &str) -> KeyId {
        self.interner.get_or_intern(key)
    }

    pub fn resolve_key_id(&self, id: KeyId) -> Option<Arc<str>> {
        self.interner.resolve(id)
    }

    pub fn resolve_tags(&self, tags: &[(&str, &str)]) -> TagSet {
        let mut resolved: Vec<(KeyId, KeyId)> = tags
            .iter()
            .map(|(k, v)| (self.resolve_key(k), self.resolve_key(v)))
            .collect();
        resolved.sort_unstable();
        resolved.dedup_by_key(|(k, _)| *k);
        TagSet::from_sorted_iter(resolved)
    }

    pub fn get_handle(&self, metric: MetricId, tags: TagSet) -> Option<MetricHandle> {
        // Read the kind before touching storage: `register` locks defs then storage.
        let kind = self.metric_kind(metric)?;
        let series_map = self.storage.get(&metric)?;

        if let Some(storage) = series_map.get(&tags) {
            return Some(storage.handle());
        }

        let storage = series_map
            .entry(tags)
            .or_insert_with(|| MetricStorage::new(kind));
        Some(storage.handle())
    }

    pub fn query(&self, metric: MetricId) -> Query<'_> {
        Query::new(self, metric)
    }

    pub(crate) fn visit_series(&self, metric: MetricId, mut f: impl FnMut(&TagSet, &MetricStorage)) {
        let Some(series_map) = self.storage.get(&metric) else {
            return;
        };
        for series in series_map.iter() {
            f(series.key(), series.value());
        }
    }

    fn tag_strings(&self, tags: &TagSet) -> Vec<(String, String)> {
        let resolve = |id| {
            self.interner
                .resolve(id)
                .map(|s| s.to_string())
                .unwrap_or_default()
        };
        let mut out: Vec<(String, String)> =
            tags.iter().map(|(k, v)| (resolve(k), resolve(v))).collect();
        out.sort();
        out
    }

    /// Every series of every metric, ordered by metric name then tags (tags sorted by name).
    pub fn summarize(&self) -> Vec<MetricSeriesSummary> {
        let mut out = Vec::new();
        let defs = self.defs.read();

        for (idx, def) in defs.iter().enumerate() {
            let Some(series_map) = self.storage.get(&MetricId(idx as u32)) else {
                continue;
            };

            let name = self
                .interner
                .resolve(def.name)
                .map(|s| s.to_string())
                .unwrap_or_default();

            for series in series_map.iter() {
                out.push(MetricSeriesSummary {
                    name: name.clone(),
                    kind: def.kind,
                    tags: self.tag_strings(series.key()),
                    values: series.value().value(),
                });
            }
        }

        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.tags.cmp(&b.tags)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricValue;

    #[test]
    fn register_is_idempotent_and_first_kind_wins() {
        let reg = Registry::default();
        let a = reg.register("checks", MetricKind::Rate);
        let b = reg.register("checks", MetricKind::Counter);
        assert_eq!(a, b);
        assert_eq!(reg.lookup_metric("checks"), Some((a, MetricKind::Rate)));
        assert!(reg.lookup_metric("missing").is_none());

        reg.register("vus", MetricKind::Gauge);
        let names: Vec<String> = reg.metrics().into_iter().map(|(_, n, _)| n).collect();
        assert_eq!(names, vec!["checks".to_string(), "vus".to_string()]);
    }

    #[test]
    fn handles_share_series_storage() {
        let reg = Registry::default();
        let m = reg.register("http_reqs", MetricKind::Counter);
        let tags = reg.resolve_tags(&[("status", "201"), ("method", "POST")]);

        let h1 = reg
            .get_handle(m, tags.clone())
            .unwrap_or_else(|| panic!("expected handle"));
        let h2 = reg
            .get_handle(m, tags)
            .unwrap_or_else(|| panic!("expected handle"));
        h1.increment(2);
        h2.increment(3);

        let summary = reg.summarize();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].name, "http_reqs");
        assert_eq!(
            summary[0].tags,
            vec![
                ("method".to_string(), "POST".to_string()),
                ("status".to_string(), "201".to_string())
            ]
        );
        assert!(matches!(summary[0].values, MetricValue::Counter(5)));
    }

    #[test]
    fn resolve_tags_sorts_by_key() {
        let reg = Registry::default();
        // Intern in reverse order so id order differs from insertion order.
        let z = reg.resolve_key("z");
        let a = reg.resolve_key("a");
        let tags = reg.resolve_tags(&[("a", "1"), ("z", "2")]);
        let keys: Vec<KeyId> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![z, a]);
        assert!(tags.get(a).is_some());
    }
}

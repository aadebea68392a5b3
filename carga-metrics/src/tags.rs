use crate::key::KeyId;
use smallvec::SmallVec;

/// Sorted `(key, value)` pairs identifying one series of a metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet {
    // Most series carry scenario/group/name/status: four inline slots.
    pub(crate) tags: SmallVec<[(KeyId, KeyId); 4]>,
}

impl TagSet {
    /// Caller guarantees the pairs are sorted by key.
    pub fn from_sorted_iter(iter: impl IntoIterator<Item = (KeyId, KeyId)>) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyId, KeyId)> + '_ {
        self.tags.iter().copied()
    }

    pub fn get(&self, key: KeyId) -> Option<KeyId> {
        let idx = self.tags.partition_point(|(k, _)| *k < key);
        self.tags
            .get(idx)
            .and_then(|(k, v)| (*k == key).then_some(*v))
    }

    /// Keeps only the given keys (those present), preserving sort order.
    pub fn project(&self, keys: &[KeyId]) -> TagSet {
        let tags = self
            .tags
            .iter()
            .filter(|(k, _)| keys.contains(k))
            .copied()
            .collect();
        TagSet { tags }
    }
}

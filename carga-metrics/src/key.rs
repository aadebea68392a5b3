use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Interned string id used for metric names, tag keys and tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u32);

impl From<u32> for KeyId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<KeyId> for u32 {
    fn from(v: KeyId) -> Self {
        v.0
    }
}

#[derive(Debug, Default)]
struct Tables {
    ids: HashMap<Arc<str>, u32>,
    strings: Vec<Arc<str>>,
}

#[derive(Debug, Default)]
pub(crate) struct Interner {
    tables: RwLock<Tables>,
}

impl Interner {
    pub(crate) fn get_or_intern(&self, s: &str) -> KeyId {
        if let Some(&id) = self.tables.read().ids.get(s) {
            return KeyId(id);
        }

        let mut tables = self.tables.write();
        // Another writer may have won the race between the two locks.
        if let Some(&id) = tables.ids.get(s) {
            return KeyId(id);
        }

        let id = u32::try_from(tables.strings.len()).unwrap_or(u32::MAX);
        let s: Arc<str> = Arc::from(s);
        tables.strings.push(s.clone());
        tables.ids.insert(s, id);
        KeyId(id)
    }

    pub(crate) fn resolve(&self, id: KeyId) -> Option<Arc<str>> {
        self.tables.read().strings.get(id.0 as usize).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_resolvable() {
        let interner = Interner::default();
        let a = interner.get_or_intern("scenario");
        let b = interner.get_or_intern("group");
        assert_ne!(a, b);
        assert_eq!(interner.get_or_intern("scenario"), a);
        assert_eq!(interner.resolve(b).as_deref(), Some("group"));
        assert!(interner.resolve(KeyId::from(99)).is_none());
    }
}

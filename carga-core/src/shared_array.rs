use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Read-only data loaded once before the run and shared by every VU.
#[derive(Debug)]
pub struct SharedArray<T> {
    name: String,
    items: Arc<[T]>,
}

impl<T> Clone for SharedArray<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            items: self.items.clone(),
        }
    }
}

impl<T> SharedArray<T> {
    pub fn new(name: &str, items: Vec<T>) -> Self {
        Self {
            name: name.to_string(),
            items: Arc::from(items),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: DeserializeOwned> SharedArray<T> {
    /// Loads a JSON array file. Anything other than an array of `T` is an error.
    pub fn load_json(name: &str, path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();
        let raw = std::fs::read(path).map_err(|source| Error::FixtureRead {
            path: path_str.clone(),
            source,
        })?;
        let items: Vec<T> = serde_json::from_slice(&raw).map_err(|source| Error::FixtureParse {
            path: path_str.clone(),
            source,
        })?;

        tracing::info!(name, path = %path_str, entries = items.len(), "loaded shared array");
        Ok(Self::new(name, items))
    }
}

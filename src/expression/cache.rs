//! Context-free result cache
//!
//! Keyed by trimmed expression text. Inserts stop once the cache is full;
//! nothing is evicted until [`ExpressionCache::clear`].

use std::collections::HashMap;
use std::sync::RwLock;

pub const DEFAULT_CACHE_CAPACITY: usize = 500;

#[derive(Debug)]
pub struct ExpressionCache {
    entries: RwLock<HashMap<String, Vec<String>>>,
    capacity: usize,
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ExpressionCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    /// Store a result unless the cache is already full
    pub fn insert(&self, key: &str, diagnostics: &[String]) {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        if entries.len() < self.capacity || entries.contains_key(key) {
            entries.insert(key.to_string(), diagnostics.to_vec());
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

//! Whole-document result cache
//!
//! Keyed by document text plus the base directory input files resolve
//! against. Entries expire after a TTL; once full, the oldest entry is
//! evicted to make room.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use log::trace;

use super::ValidationResult;

pub const DEFAULT_DOCUMENT_CAPACITY: usize = 100;
pub const DEFAULT_DOCUMENT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DocumentKey {
    content: String,
    base_dir: Option<PathBuf>,
}

impl DocumentKey {
    fn new(content: &str, base_dir: Option<&Path>) -> Self {
        Self {
            content: content.to_string(),
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }
}

#[derive(Debug)]
struct Entry {
    result: ValidationResult,
    stored_at: Instant,
}

/// Counters reported by [`DocumentCache::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub len: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
pub struct DocumentCache {
    entries: RwLock<HashMap<DocumentKey, Entry>>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_CAPACITY, DEFAULT_DOCUMENT_TTL)
    }
}

impl DocumentCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cached result for this document, unless missing or expired
    pub fn get(&self, content: &str, base_dir: Option<&Path>) -> Option<ValidationResult> {
        let key = DocumentKey::new(content, base_dir);

        let expired = {
            let entries = match self.entries.read() {
                Ok(entries) => entries,
                Err(poisoned) => poisoned.into_inner(),
            };
            match entries.get(&key) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.result.clone());
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut entries = match self.entries.write() {
                Ok(entries) => entries,
                Err(poisoned) => poisoned.into_inner(),
            };
            if entries
                .get(&key)
                .is_some_and(|entry| entry.stored_at.elapsed() >= self.ttl)
            {
                entries.remove(&key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a result, evicting the oldest entry when full
    pub fn insert(&self, content: &str, base_dir: Option<&Path>, result: &ValidationResult) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        let ttl = self.ttl;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        let mut evicted = (before - entries.len()) as u64;

        let key = DocumentKey::new(content, base_dir);
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                evicted += 1;
            }
        }

        if evicted > 0 {
            trace!("evicted {} cached documents", evicted);
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }

        entries.insert(
            key,
            Entry {
                result: result.clone(),
                stored_at: Instant::now(),
            },
        );
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

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            len: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;

    fn result_with(message: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.add_issue(1, message.to_string(), Severity::Error, "test_rule");
        result
    }

    #[test]
    fn test_hit_after_insert() {
        let cache = DocumentCache::default();
        assert!(cache.get("[a]\n", None).is_none());

        cache.insert("[a]\n", None, &result_with("boom"));
        let cached = cache.get("[a]\n", None).unwrap();
        assert_eq!(cached.issues()[0].message, "boom");

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[test]
    fn test_base_dir_is_part_of_the_key() {
        let cache = DocumentCache::default();
        cache.insert("[a]\n", Some(Path::new("/one")), &result_with("one"));

        assert!(cache.get("[a]\n", Some(Path::new("/two"))).is_none());
        assert!(cache.get("[a]\n", None).is_none());
        assert!(cache.get("[a]\n", Some(Path::new("/one"))).is_some());
    }

    #[test]
    fn test_entries_expire() {
        let cache = DocumentCache::new(10, Duration::from_millis(20));
        cache.insert("x", None, &ValidationResult::new());
        assert!(cache.get("x", None).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("x", None).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_oldest_evicted_at_capacity() {
        let cache = DocumentCache::new(2, DEFAULT_DOCUMENT_TTL);
        cache.insert("first", None, &result_with("1"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("second", None, &result_with("2"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("third", None, &result_with("3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("first", None).is_none());
        assert!(cache.get("second", None).is_some());
        assert!(cache.get("third", None).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_clear() {
        let cache = DocumentCache::default();
        cache.insert("x", None, &ValidationResult::new());
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("x", None).is_none());
    }
}

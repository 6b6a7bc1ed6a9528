//! In-memory response cache keyed by encoded filters.
//!
//! Each query instance owns its own cache; nothing is shared across
//! widgets, so no locking is involved.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default response cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Cache of decoded responses keyed by [`WireParams::cache_key`].
///
/// [`WireParams::cache_key`]: crate::query::WireParams::cache_key
#[derive(Debug)]
pub struct ResponseCache<T> {
    entries: HashMap<String, CachedEntry<T>>,
    ttl: Duration,
    enabled: bool,
}

#[derive(Debug)]
struct CachedEntry<T> {
    value: T,
    cached_at: Instant,
}

impl<T: Clone> ResponseCache<T> {
    /// Create a new cache with the given TTL in seconds.
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::from_secs(ttl_secs),
            enabled: true,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    /// Look up a cached response. Returns `None` if missing or expired.
    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key).and_then(|entry| {
            if entry.cached_at.elapsed() < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    pub fn insert(&mut self, key: String, value: T) {
        if !self.enabled {
            return;
        }
        // Expired entries are only ever replaced; drop them on write.
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.cached_at.elapsed() < ttl);
        self.entries.insert(
            key,
            CachedEntry {
                value,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_returns_none_for_missing_key() {
        let cache: ResponseCache<u32> = ResponseCache::default();
        assert_eq!(cache.get("by=centre"), None);
    }

    #[test]
    fn cache_stores_and_retrieves_responses() {
        let mut cache = ResponseCache::new(300);
        cache.insert("by=centre".to_string(), 42u32);
        assert_eq!(cache.get("by=centre"), Some(42));
        assert_eq!(cache.get("by=statut"), None);
    }

    #[test]
    fn cache_entries_expire_after_ttl() {
        let mut cache = ResponseCache::new(0);
        cache.insert("by=centre".to_string(), 1u32);

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get("by=centre"), None);
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let mut cache = ResponseCache::disabled();
        cache.insert("k".to_string(), 1u32);
        assert!(cache.is_empty());
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn invalidate_removes_one_entry() {
        let mut cache = ResponseCache::new(300);
        cache.insert("a".to_string(), 1u32);
        cache.insert("b".to_string(), 2u32);
        cache.invalidate("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}

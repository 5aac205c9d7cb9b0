//! Time-to-live cache for memoizing external fetches
//!
//! Entries expire once they are older than their TTL and are dropped lazily
//! on the next access or on the sweep that precedes every insert. When the
//! cache is full, the entry created earliest is evicted regardless of TTL.

mod key;

pub use key::generate_key;

use ahash::{HashMap, HashMapExt};
use std::borrow::Borrow;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) > self.ttl
    }
}

/// Hit/miss counters and current size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Key-value store with per-entry TTL and a size cap
pub struct ExpiringCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a live entry. An expired entry is removed and reported absent.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(Instant::now()),
            None => {
                self.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Insert a value, using the default TTL when `ttl` is `None`
    pub fn set(&mut self, key: K, value: V, ttl: Option<Duration>) {
        self.purge_expired();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            tracing::trace!("Cache full ({} entries), evicting oldest", self.max_entries);
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_get_returns_live_value() {
        let mut cache = ExpiringCache::new(Duration::from_secs(60), 10);
        cache.set("a".to_string(), 1, None);
        assert_eq!(cache.get("a"), Some(&1));
        assert_eq!(cache.get("b"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expired_entry_is_absent_and_removed() {
        let mut cache = ExpiringCache::new(Duration::from_secs(60), 10);
        cache.set("short".to_string(), "v", Some(Duration::from_millis(10)));
        assert_eq!(cache.len(), 1);

        sleep(Duration::from_millis(15));

        assert_eq!(cache.get("short"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_sweeps_expired_entries() {
        let mut cache = ExpiringCache::new(Duration::from_secs(60), 10);
        cache.set(1, "stale", Some(Duration::from_millis(5)));
        cache.set(2, "stale", Some(Duration::from_millis(5)));
        sleep(Duration::from_millis(10));

        cache.set(3, "fresh", None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut cache = ExpiringCache::new(Duration::from_secs(60), 2);
        cache.set("first", 1, None);
        sleep(Duration::from_millis(2));
        cache.set("second", 2, None);
        sleep(Duration::from_millis(2));
        cache.set("third", 3, None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("first"), None);
        assert_eq!(cache.get("second"), Some(&2));
        assert_eq!(cache.get("third"), Some(&3));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut cache = ExpiringCache::new(Duration::from_secs(60), 2);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.set("a", 10, None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(&10));
        assert_eq!(cache.get("b"), Some(&2));
    }

    #[test]
    fn test_purge_expired_counts() {
        let mut cache = ExpiringCache::new(Duration::from_millis(5), 10);
        cache.set("x", (), None);
        cache.set("y", (), Some(Duration::from_secs(60)));
        sleep(Duration::from_millis(10));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}

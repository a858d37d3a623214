//! Time-bounded result cache shared between engine runs.
//!
//! Entries carry their own lifetime so that price-sensitive results can expire
//! sooner than daily analyses stored in the same cache. A poisoned lock is
//! treated as a miss; the cache never fails a caller.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing live.
    pub misses: u64,
    /// Entries currently stored, live or not.
    pub entries: usize,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    hits: u64,
    misses: u64,
}

/// A `Mutex`-guarded map whose entries expire after a per-entry TTL.
///
/// ```
/// use std::time::Duration;
/// use idx_ta::cache::TtlCache;
///
/// let cache = TtlCache::new(16);
/// cache.insert("BBCA", 9200.0, Duration::from_secs(60));
/// assert_eq!(cache.get(&"BBCA").as_deref(), Some(&9200.0));
/// ```
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_entries: usize,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    /// Creates an empty cache holding at most `max_entries` values.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the value for `key` if it has not expired.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.get_at(key, Instant::now())
    }

    /// Like [`get`](Self::get) with an explicit clock reading.
    pub fn get_at(&self, key: &K, now: Instant) -> Option<Arc<V>> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let found = inner
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| Arc::clone(&entry.value));
        if found.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
            inner.entries.remove(key);
        }
        found
    }

    /// Stores `value` under `key` for `ttl`, evicting expired entries and then
    /// the oldest ones when the cache is full.
    pub fn insert(&self, key: K, value: V, ttl: Duration) -> Arc<V> {
        self.insert_at(key, value, ttl, Instant::now())
    }

    /// Like [`insert`](Self::insert) with an explicit clock reading.
    pub fn insert_at(&self, key: K, value: V, ttl: Duration, now: Instant) -> Arc<V> {
        let value = Arc::new(value);
        let Ok(mut inner) = self.inner.lock() else {
            return value;
        };
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            inner.entries.retain(|_, entry| entry.is_live(now));
            while inner.entries.len() >= self.max_entries {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        inner.entries.remove(&k);
                    }
                    None => break,
                }
            }
        }
        inner.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                inserted_at: now,
                ttl,
            },
        );
        value
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.inner.lock().map_or(0, |mut inner| {
            let before = inner.entries.len();
            inner.entries.retain(|_, entry| entry.is_live(now));
            before - inner.entries.len()
        })
    }

    /// Removes everything.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().map_or_else(
            |_| CacheStats::default(),
            |inner| CacheStats {
                hits: inner.hits,
                misses: inner.misses,
                entries: inner.entries.len(),
            },
        )
    }
}

//! Time-to-live cache of finished results.
//!
//! Entries are immutable once stored and shared as `Arc`s. There is no
//! background sweep: an entry found past its TTL is removed by the lookup
//! that finds it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct CacheEntry<V> {
    value: Arc<V>,
    inserted: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted) < ttl
    }
}

/// String-keyed cache with lazy expiry.
pub struct ResultCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.get_at(key, Instant::now())
    }

    /// Looks `key` up as of `now`, evicting it if it has expired.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<Arc<V>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh(self.ttl, now) => {
                    return Some(Arc::clone(&entry.value))
                }
                Some(_) => {}
            }
        }

        // Expired under the read lock; recheck before removing in case a
        // fresh value was stored in between
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl, now) => Some(Arc::clone(&entry.value)),
            Some(_) => {
                entries.remove(key);
                log::trace!("evicted expired cache entry");
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: Arc<V>) {
        self.set_at(key, value, Instant::now());
    }

    pub fn set_at(&self, key: impl Into<String>, value: Arc<V>, now: Instant) {
        self.entries.write().insert(
            key.into(),
            CacheEntry {
                value,
                inserted: now,
            },
        );
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

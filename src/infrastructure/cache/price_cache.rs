//! In-process recently-seen price cache.
//!
//! Entries expire after a TTL; when the cache is full the oldest entry is
//! evicted to make room.

use crate::domain::ports::price_cache::{MarketSnapshot, RecentPriceCache};
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    inserted: Instant,
    snapshot: MarketSnapshot,
}

pub struct TtlPriceCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    max_entries: usize,
}

impl TtlPriceCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().inserted)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            tracing::debug!(key = %key, "price cache evicted oldest entry");
        }
    }
}

impl RecentPriceCache for TtlPriceCache {
    fn get(&self, key: &str) -> Option<MarketSnapshot> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => return Some(entry.snapshot.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn put(&self, key: &str, snapshot: MarketSnapshot) {
        self.entries.retain(|_, e| e.inserted.elapsed() < self.ttl);
        if !self.entries.contains_key(key) {
            while self.entries.len() >= self.max_entries {
                self.evict_oldest();
            }
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                inserted: Instant::now(),
                snapshot,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot { platforms: Vec::new() }
    }

    #[test]
    fn test_hit_then_expire() {
        let cache = TtlPriceCache::new(Duration::from_millis(30), 10);
        cache.put("A", snapshot());
        assert!(cache.get("A").is_some());
        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get("A").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_entry_evicted_first() {
        let cache = TtlPriceCache::new(Duration::from_secs(60), 2);
        cache.put("first", snapshot());
        std::thread::sleep(Duration::from_millis(2));
        cache.put("second", snapshot());
        std::thread::sleep(Duration::from_millis(2));
        cache.put("third", snapshot());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = TtlPriceCache::new(Duration::from_secs(60), 2);
        cache.put("a", snapshot());
        cache.put("b", snapshot());
        cache.put("a", snapshot());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_some());
    }
}

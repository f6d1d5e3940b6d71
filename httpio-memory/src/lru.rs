//! Recency-ordered entry table.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use httpio_backend::CacheEntry;

struct Slot {
    entry: CacheEntry,
    tick: u64,
}

/// Bounded map that remembers the order entries were last touched in.
///
/// Every access stamps the entry with a fresh, strictly increasing tick. The
/// `recency` index orders keys by tick, so its first element is always the
/// least recently used key.
pub(crate) struct Lru {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, Slot>,
    recency: BTreeMap<u64, String>,
}

impl Lru {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tick: 0,
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Looks up `key` and marks it most recently used.
    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        let tick = self.next_tick();
        let slot = self.entries.get_mut(key)?;
        self.recency.remove(&slot.tick);
        slot.tick = tick;
        self.recency.insert(tick, key.to_owned());
        Some(&mut slot.entry)
    }

    /// Inserts or replaces `key`, returning the entry evicted to make room.
    pub(crate) fn insert(&mut self, key: String, entry: CacheEntry) -> Option<CacheEntry> {
        let tick = self.next_tick();
        if let Some(slot) = self.entries.get_mut(&key) {
            self.recency.remove(&slot.tick);
            slot.tick = tick;
            slot.entry = entry;
            self.recency.insert(tick, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };
        self.recency.insert(tick, key.clone());
        self.entries.insert(key, Slot { entry, tick });
        evicted
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.tick);
        Some(slot.entry)
    }

    fn pop_lru(&mut self) -> Option<CacheEntry> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key).map(|slot| slot.entry)
    }

    /// Drops every entry expired at `now`, returning how many were removed.
    pub(crate) fn remove_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    #[cfg(test)]
    fn keys_oldest_first(&self) -> Vec<&str> {
        self.recency.values().map(String::as_str).collect()
    }
}

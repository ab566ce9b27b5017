//! Bounded TTL cache with insertion-order eviction.

use std::collections::{HashMap, VecDeque};

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<V> {
    /// Present and younger than the TTL.
    Fresh(V),
    /// Present but expired.
    Stale,
    Miss,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: u64,
    seq: u64,
}

/// Map from key to value with a TTL and a maximum entry count.
///
/// When full, the entry inserted longest ago is evicted. Re-inserting a key
/// refreshes both its age and its eviction position. Not synchronized; the
/// owner wraps it in a lock.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, Entry<V>>,
    /// Insertion log; items whose seq no longer matches the entry are skipped.
    order: VecDeque<(u64, String)>,
    next_seq: u64,
    ttl_millis: u64,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl_millis: u64, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            ttl_millis,
            max_entries: max_entries.max(1),
        }
    }

    /// Probe `key` at time `now` (epoch millis).
    pub fn get(&self, key: &str, now: u64) -> CacheLookup<V> {
        match self.entries.get(key) {
            Some(entry) if now.saturating_sub(entry.inserted_at) < self.ttl_millis => {
                CacheLookup::Fresh(entry.value.clone())
            }
            Some(_) => CacheLookup::Stale,
            None => CacheLookup::Miss,
        }
    }

    /// Insert or refresh `key`, evicting the oldest entries if over capacity.
    pub fn insert(&mut self, key: String, value: V, now: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.push_back((seq, key.clone()));
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                seq,
            },
        );

        while self.entries.len() > self.max_entries {
            let Some((seq, key)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&key).is_some_and(|e| e.seq == seq) {
                self.entries.remove(&key);
            }
        }
        self.compact();
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl_millis(&self) -> u64 {
        self.ttl_millis
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Drop dead log records once they outnumber live entries.
    fn compact(&mut self) {
        if self.order.len() > self.entries.len() * 2 + 16 {
            let entries = &self.entries;
            self.order
                .retain(|(seq, key)| entries.get(key).is_some_and(|e| e.seq == *seq));
        }
    }
}

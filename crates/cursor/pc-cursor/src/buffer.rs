//! Insertion-ordered buffer keyed by sequence index.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct Entry<V> {
    /// Position in insertion order.
    seq: u64,
    value: V,
}

/// Map from integer index to a value that remembers insertion order.
///
/// Lookups go through a hash map; the insertion order is kept in a separate
/// ordered index so the oldest entries can be found and evicted without
/// scanning. Overwriting an existing key keeps its original position.
#[derive(Debug)]
pub struct OrderedBuffer<V> {
    entries: HashMap<u64, Entry<V>>,

    /// Insertion sequence number -> key.
    order: BTreeMap<u64, u64>,

    next_seq: u64,
}

impl<V> Default for OrderedBuffer<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<V> OrderedBuffer<V> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`.
    ///
    /// A new key is appended to the insertion order. An existing key has its
    /// value replaced in place.
    pub fn set(&mut self, key: u64, value: V) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key);
        self.entries.insert(key, Entry { seq, value });
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: u64) -> Option<&V> {
        self.entries.get(&key).map(|entry| &entry.value)
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Remove `key` and its order entry. No-op if absent.
    pub fn remove(&mut self, key: u64) -> Option<V> {
        let entry = self.entries.remove(&key)?;
        self.order.remove(&entry.seq);
        Some(entry.value)
    }

    /// Remove the `count` oldest entries by insertion order.
    ///
    /// Returns how many entries were actually removed.
    pub fn remove_oldest(&mut self, count: usize) -> usize {
        let mut removed = 0;
        while removed < count {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&key);
            removed += 1;
        }
        removed
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest live key.
    pub fn first_key(&self) -> Option<u64> {
        self.order.first_key_value().map(|(_, key)| *key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.order.values().copied()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

//! Request deduplication for in-flight work.
//!
//! Maps a caller-supplied key to the pending result of the request that
//! owns it. Entries live exactly as long as the owning request is queued
//! or executing; the scheduler removes them before delivering a result.

use std::collections::HashMap;

struct DedupEntry<V> {
    owner: u64,
    value: V,
}

/// In-flight dedup cache keyed by dedupe key.
pub struct DedupCache<V> {
    entries: HashMap<String, DedupEntry<V>>,
}

impl<V: Clone> DedupCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get the shared value for an outstanding request, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Register `owner` as the outstanding request for `key`.
    pub fn insert(&mut self, key: String, owner: u64, value: V) {
        self.entries.insert(key, DedupEntry { owner, value });
    }

    /// Remove the entry for `key` if it still belongs to `owner`.
    pub fn remove(&mut self, key: &str, owner: u64) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.owner == owner => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Number of entries in cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for DedupCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_returns_owner_value() {
        let mut cache = DedupCache::new();
        cache.insert("meta".into(), 1, "pending-1");

        assert_eq!(cache.get("meta"), Some("pending-1"));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn remove_requires_matching_owner() {
        let mut cache = DedupCache::new();
        cache.insert("meta".into(), 1, ());

        assert!(!cache.remove("meta", 2));
        assert_eq!(cache.get("meta"), Some(()));
        assert!(cache.remove("meta", 1));
        assert!(cache.is_empty());
    }

    #[test]
    fn reinsert_transfers_ownership() {
        let mut cache = DedupCache::new();
        cache.insert("k".into(), 1, 'a');
        assert!(cache.remove("k", 1));
        cache.insert("k".into(), 7, 'b');

        assert!(!cache.remove("k", 1));
        assert_eq!(cache.get("k"), Some('b'));
        assert_eq!(cache.len(), 1);
    }
}

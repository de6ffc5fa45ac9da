use super::replacer::Replacer;
use shadowdb_catalog::record_id::PageId;
use std::collections::{BTreeMap, HashMap};

/// Strict least-recently-used ordering over page ids.
///
/// Every access stamps the page with a fresh timestamp. `node_store` indexes page id to its
/// current stamp and `history` orders stamps, so the oldest stamp is always the victim.
#[derive(Debug, Default)]
pub(crate) struct LruReplacer {
    node_store: HashMap<PageId, u64>,
    history: BTreeMap<u64, PageId>,
    current_timestamp: u64,
}

impl LruReplacer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn current_timestamp(&mut self) -> u64 {
        let old_timestamp = self.current_timestamp;
        self.current_timestamp += 1;
        old_timestamp
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, page_id: PageId) {
        let timestamp = self.current_timestamp();
        if let Some(previous) = self.node_store.insert(page_id, timestamp) {
            self.history.remove(&previous);
        }
        self.history.insert(timestamp, page_id);
    }

    fn victim(&self) -> Option<PageId> {
        self.history.values().next().copied()
    }

    fn remove(&mut self, page_id: PageId) {
        if let Some(timestamp) = self.node_store.remove(&page_id) {
            self.history.remove(&timestamp);
        }
    }

    fn size(&self) -> usize {
        self.node_store.len()
    }

    fn order(&self) -> Vec<PageId> {
        self.history.values().rev().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_evicts_least_recent() {
        let mut replacer = LruReplacer::new();
        for page_id in 1..=4 {
            replacer.record_access(page_id);
        }
        // Touching 1 again makes 2 the oldest.
        replacer.record_access(1);
        assert_eq!(replacer.order(), vec![1, 4, 3, 2]);
        assert_eq!(replacer.victim(), Some(2));

        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), Some(3));
        assert_eq!(replacer.size(), 2);
    }

    #[test]
    fn test_remove() {
        let mut replacer = LruReplacer::new();
        replacer.record_access(7);
        replacer.record_access(8);
        replacer.remove(7);
        replacer.remove(42);
        assert_eq!(replacer.order(), vec![8]);
        assert_eq!(replacer.evict(), Some(8));
        assert_eq!(replacer.evict(), None);
    }
}

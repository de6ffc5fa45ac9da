use shadowdb_catalog::record_id::PageId;
use std::fmt::Debug;

pub trait Replacer: Send + Sync + Debug {
    /// Record the event that the given page is accessed at the current timestamp, making it the
    /// most recently used. Creates a new entry if the page has not been seen before.
    fn record_access(&mut self, page_id: PageId);

    /// Returns the page the replacement policy would evict next, without removing it.
    fn victim(&self) -> Option<PageId>;

    /// Removes and returns the page the replacement policy evicts next.
    fn evict(&mut self) -> Option<PageId> {
        let page_id = self.victim()?;
        self.remove(page_id);
        Some(page_id)
    }

    /// Removes a page from the replacer entirely.
    fn remove(&mut self, page_id: PageId);

    /// Returns the number of pages tracked by the replacer.
    fn size(&self) -> usize;

    /// Returns the tracked pages from most to least recently used.
    fn order(&self) -> Vec<PageId>;
}

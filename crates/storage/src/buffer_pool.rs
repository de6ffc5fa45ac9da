use crate::disk::StorageBackend;
use crate::page::{Page, ShadowPage};
use crate::replacer::lru_replacer::LruReplacer;
use crate::replacer::replacer::Replacer;
use crate::Result;
use shadowdb_catalog::catalog::{PageCatalog, PageLocation};
use shadowdb_catalog::record_id::{PageId, PENDING_PAGE_ID};
use shadowdb_catalog::schema::SchemaRef;
use shadowdb_error::Error;
use std::collections::HashMap;

/// A bounded cache of one table's pages over the table's storage backend.
///
/// Pages are written back lazily: a dirty page reaches the backend only when it is evicted (or
/// when the whole pool is flushed at close), and its new location is then recorded in the page
/// catalog.
#[derive(Debug)]
pub struct BufferPool {
    /// Resident pages.
    frames: HashMap<PageId, Page>,
    /// Decides which resident page leaves next.
    replacer: Box<dyn Replacer>,
    /// The maximum number of resident pages.
    max_pages: usize,
    /// The number of rows every page of this table holds.
    max_rows: usize,
    /// The next page id `new_page` hands out.
    next_page_id: PageId,
    /// Page id -> location of its most recent on-disk image.
    catalog: PageCatalog,
    backend: Box<dyn StorageBackend>,
    /// The schema pages are encoded and decoded with.
    schema: SchemaRef,
}

impl BufferPool {
    /// Creates a pool over `backend` whose on-disk pages are described by `catalog`.
    pub fn new(
        schema: SchemaRef,
        backend: Box<dyn StorageBackend>,
        catalog: PageCatalog,
        max_pages: usize,
        max_rows: usize,
    ) -> Self {
        Self {
            frames: HashMap::new(),
            replacer: Box::new(LruReplacer::new()),
            max_pages: max_pages.max(1),
            max_rows: max_rows.max(1),
            next_page_id: catalog.next_page_id(),
            catalog,
            backend,
            schema,
        }
    }

    /// Returns the page, loading it from the backend if it is not resident. The page becomes
    /// the most recently used. Returns `None` for a page that has no on-disk image.
    pub fn get_page(&mut self, page_id: PageId) -> Result<Option<&mut Page>> {
        if self.frames.contains_key(&page_id) {
            self.replacer.record_access(page_id);
        } else {
            let Some(location) = self.catalog.get(page_id) else {
                return Ok(None);
            };
            let bytes = self.backend.read_at(location.offset, location.length)?;
            let mut page = Page::decode(page_id, &bytes, &self.schema, self.max_rows)?;
            page.set_location(location);
            tracing::debug!(page_id, offset = location.offset, "loaded page");

            self.frames.insert(page_id, page);
            self.replacer.record_access(page_id);
            self.evict_excess()?;
        }
        Ok(self.frames.get_mut(&page_id))
    }

    /// Returns an allocated page for modification. Unlike [`Self::get_page`], a page that was
    /// allocated but has no on-disk image (it was empty when last evicted) comes back as an
    /// empty page rather than `None`.
    pub fn live_page(&mut self, page_id: PageId) -> Result<&mut Page> {
        if page_id == PENDING_PAGE_ID || page_id >= self.next_page_id {
            return Err(Error::BufferPoolError(format!(
                "page {page_id} was never allocated"
            )));
        }
        if !self.frames.contains_key(&page_id) && self.catalog.get(page_id).is_none() {
            self.add_page(Page::new(page_id, self.max_rows))?;
        }
        self.get_page(page_id)?
            .ok_or_else(|| Error::BufferPoolError(format!("page {page_id} is unavailable")))
    }

    /// Allocates the next page id and caches an empty dirty page for it.
    pub fn new_page(&mut self) -> Result<&mut Page> {
        let page_id = self.next_page_id;
        self.next_page_id += 1;

        let mut page = Page::new(page_id, self.max_rows);
        page.set_dirty(true);
        self.add_page(page)?;
        self.frames.get_mut(&page_id).ok_or_else(|| {
            Error::BufferPoolError(format!("new page {page_id} was evicted immediately"))
        })
    }

    /// Caches `page`, replacing any resident page with the same id, as the most recently used.
    pub fn add_page(&mut self, page: Page) -> Result<()> {
        let page_id = page.id();
        self.frames.insert(page_id, page);
        self.replacer.record_access(page_id);
        self.evict_excess()
    }

    /// Evicts the least recently used page, writing it back first if it is dirty. Returns the
    /// evicted page id, or `None` if nothing is resident. If the write fails the page stays
    /// resident.
    pub fn evict_one(&mut self) -> Result<Option<PageId>> {
        let Some(page_id) = self.replacer.victim() else {
            return Ok(None);
        };
        let Some(page) = self.frames.get_mut(&page_id) else {
            self.replacer.remove(page_id);
            return Ok(Some(page_id));
        };

        if page.is_dirty() {
            let bytes = page.encode(&self.schema);
            let offset = self.backend.append(&bytes)?;
            let location = PageLocation {
                offset,
                length: bytes.len() as u64,
            };
            page.set_location(location);
            page.set_dirty(false);
            self.catalog.insert(page_id, location);
            tracing::debug!(
                page_id,
                offset,
                length = location.length,
                "flushed dirty page on eviction"
            );
        }

        self.frames.remove(&page_id);
        self.replacer.evict();
        Ok(Some(page_id))
    }

    fn evict_excess(&mut self) -> Result<()> {
        while self.frames.len() > self.max_pages {
            self.evict_one()?;
        }
        Ok(())
    }

    /// Returns an independent snapshot of the page's rows, fetching the page if needed.
    pub fn copy_page(&mut self, page_id: PageId) -> Result<Option<ShadowPage>> {
        Ok(self.get_page(page_id)?.map(|page| ShadowPage::copy_of(page)))
    }

    /// Evicts every resident page, so that every dirty page has been written back.
    pub fn flush_all(&mut self) -> Result<()> {
        while self.evict_one()?.is_some() {}
        self.backend.sync()
    }

    /// Whether the page is currently cached.
    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.frames.contains_key(&page_id)
    }

    pub fn resident_count(&self) -> usize {
        self.replacer.size()
    }

    /// Resident page ids from most to least recently used.
    pub fn resident_page_ids(&self) -> Vec<PageId> {
        self.replacer.order()
    }

    /// The id of the most recently allocated page, if any page was ever allocated.
    pub fn last_page_id(&self) -> Option<PageId> {
        self.next_page_id.checked_sub(1).filter(|id| *id > 0)
    }

    /// The id the next call to `new_page` will use.
    pub fn next_page_id(&self) -> PageId {
        self.next_page_id
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn catalog(&self) -> &PageCatalog {
        &self.catalog
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Installs a new version of the schema. Only valid for append-only changes: pages already
    /// on disk must remain decodable.
    pub fn set_schema(&mut self, schema: SchemaRef) {
        self.schema = schema;
    }

    /// Replaces the catalog and the backend wholesale, as compaction does once it has rewritten
    /// every page image into a new file. All pages must have been flushed beforehand.
    pub(crate) fn replace_storage(
        &mut self,
        catalog: PageCatalog,
        backend: Box<dyn StorageBackend>,
    ) -> Result<()> {
        if !self.frames.is_empty() {
            return Err(Error::BufferPoolError(format!(
                "{} pages still resident while replacing storage",
                self.frames.len()
            )));
        }
        self.catalog = catalog;
        self.backend = backend;
        Ok(())
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn StorageBackend {
        self.backend.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{open_backend, IoMode};
    use crate::test_util::{row, schema};
    use rand::seq::SliceRandom;
    use std::path::Path;
    use std::sync::Arc;

    fn get_pool_with_size(dir: &Path, max_pages: usize) -> BufferPool {
        let backend = open_backend(&dir.join("t.data"), IoMode::Standard, 0).unwrap();
        BufferPool::new(
            Arc::new(schema()),
            backend,
            PageCatalog::new(),
            max_pages,
            4,
        )
    }

    /// Allocates `n` pages, each holding one row named after its page id.
    fn fill(pool: &mut BufferPool, n: usize) -> Vec<PageId> {
        (0..n)
            .map(|_| {
                let page = pool.new_page().unwrap();
                let id = page.id();
                page.insert(row(&format!("p{id}"), id as i64));
                id
            })
            .collect()
    }

    #[test]
    fn test_pool_never_exceeds_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = get_pool_with_size(dir.path(), 3);

        let ids = fill(&mut pool, 10);
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert_eq!(pool.resident_page_ids(), vec![10, 9, 8]);
        assert_eq!(pool.resident_count(), 3);
        // Every evicted page was dirty, so each has a catalog entry now.
        assert_eq!(pool.catalog().len(), 7);
    }

    #[test]
    fn test_lru_resident_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = get_pool_with_size(dir.path(), 4);
        let mut ids = fill(&mut pool, 12);
        pool.flush_all().unwrap();

        // After touching pages in a random order, exactly the last four touched are resident,
        // most recent first.
        ids.shuffle(&mut rand::rng());
        for id in &ids {
            assert!(pool.get_page(*id).unwrap().is_some());
        }
        let expected: Vec<PageId> = ids.iter().rev().take(4).copied().collect();
        assert_eq!(pool.resident_page_ids(), expected);

        pool.flush_all().unwrap();
        assert_eq!(pool.resident_count(), 0);
        assert!(pool.resident_page_ids().is_empty());
    }

    #[test]
    fn test_eviction_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = get_pool_with_size(dir.path(), 1);

        let first = pool.new_page().unwrap();
        first.insert(row("john", 8));
        first.insert(row("amy", 30));
        // Allocating a second page pushes the first one out to the backend.
        pool.new_page().unwrap();
        assert!(!pool.is_resident(1));
        assert!(pool.catalog().get(1).is_some());

        let reloaded = pool.get_page(1).unwrap().unwrap();
        assert!(!reloaded.is_dirty());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(0).unwrap().field("name"), Ok("john".into()));
        assert_eq!(reloaded.get(1).unwrap().field("name"), Ok("amy".into()));
    }

    #[test]
    fn test_clean_pages_are_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = get_pool_with_size(dir.path(), 1);
        fill(&mut pool, 2);
        pool.flush_all().unwrap();
        let written = pool.backend_mut().len();

        // Cycling clean pages through the pool writes nothing.
        pool.get_page(1).unwrap();
        pool.get_page(2).unwrap();
        pool.get_page(1).unwrap();
        assert_eq!(pool.backend_mut().len(), written);
    }

    #[test]
    fn test_missing_pages() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = get_pool_with_size(dir.path(), 2);
        assert!(pool.get_page(1).unwrap().is_none());
        assert!(pool.copy_page(5).unwrap().is_none());
        assert_eq!(pool.last_page_id(), None);

        // An empty page that gets flushed has a zero-length image, which reads as absent.
        pool.new_page().unwrap();
        pool.flush_all().unwrap();
        assert!(pool.get_page(1).unwrap().is_none());
        assert_eq!(pool.last_page_id(), Some(1));

        // It is still allocated, so it can be written to again.
        let page = pool.live_page(1).unwrap();
        assert!(page.is_empty());
        page.insert(row("back", 1));
        assert!(matches!(pool.live_page(0), Err(Error::BufferPoolError(_))));
        assert!(matches!(pool.live_page(2), Err(Error::BufferPoolError(_))));
    }

    #[test]
    fn test_copy_page_is_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = get_pool_with_size(dir.path(), 2);
        fill(&mut pool, 1);

        let shadow = pool.copy_page(1).unwrap().unwrap();
        assert!(shadow.is_origin());
        pool.get_page(1).unwrap().unwrap().remove(0);

        assert_eq!(shadow.rows().len(), 1);
        assert!(pool.get_page(1).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_add_page_replaces_resident_copy() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = get_pool_with_size(dir.path(), 2);
        fill(&mut pool, 2);

        let mut replacement = Page::new(1, 4);
        replacement.insert(row("new", 0));
        pool.add_page(replacement).unwrap();

        assert_eq!(pool.resident_page_ids(), vec![1, 2]);
        let page = pool.get_page(1).unwrap().unwrap();
        assert_eq!(page.get(0).unwrap().field("name"), Ok("new".into()));
    }
}

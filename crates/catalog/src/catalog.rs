use crate::column::Column;
use crate::record_id::{PageId, FIRST_PAGE_ID};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a page's encoded image lives in its table's data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
    pub offset: u64,
    pub length: u64,
}

/// The per-table mapping from page id to on-disk location.
///
/// An entry is written only when a dirty page is flushed, so a page that has never left memory
/// has none. A zero-length entry (an empty page was flushed) also means "no on-disk image".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCatalog {
    pages: BTreeMap<PageId, PageLocation>,
}

impl PageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the location of a page that has an on-disk image.
    pub fn get(&self, page_id: PageId) -> Option<PageLocation> {
        self.pages
            .get(&page_id)
            .copied()
            .filter(|location| location.length > 0)
    }

    pub fn insert(&mut self, page_id: PageId, location: PageLocation) {
        self.pages.insert(page_id, location);
    }

    pub fn remove(&mut self, page_id: PageId) -> Option<PageLocation> {
        self.pages.remove(&page_id)
    }

    /// All entries in ascending page-id order, including zero-length ones.
    pub fn iter(&self) -> impl Iterator<Item = (PageId, PageLocation)> + '_ {
        self.pages.iter().map(|(id, location)| (*id, *location))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The id a reopened table should allocate next: one past the highest catalogued id.
    pub fn next_page_id(&self) -> PageId {
        self.pages
            .keys()
            .next_back()
            .map_or(FIRST_PAGE_ID, |last| last + 1)
    }
}

/// The persisted description of a table: its columns and page catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<Column>,
    pub pages: PageCatalog,
}

impl TableMeta {
    pub fn schema(&self) -> Schema {
        Schema::new(&self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn test_zero_length_entries_are_absent() {
        let mut catalog = PageCatalog::new();
        catalog.insert(1, PageLocation { offset: 0, length: 40 });
        catalog.insert(2, PageLocation { offset: 40, length: 0 });

        assert_eq!(catalog.get(1), Some(PageLocation { offset: 0, length: 40 }));
        assert_eq!(catalog.get(2), None);
        assert_eq!(catalog.get(3), None);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_next_page_id() {
        let mut catalog = PageCatalog::new();
        assert_eq!(catalog.next_page_id(), FIRST_PAGE_ID);

        // Gaps in the catalogued ids do not cause an id to be reused.
        catalog.insert(1, PageLocation { offset: 0, length: 8 });
        catalog.insert(5, PageLocation { offset: 8, length: 8 });
        assert_eq!(catalog.next_page_id(), 6);
    }

    #[test]
    fn test_meta_json_round_trip() {
        let mut pages = PageCatalog::new();
        pages.insert(1, PageLocation { offset: 0, length: 120 });
        let meta = TableMeta {
            name: "test".to_string(),
            columns: vec![
                Column::new("name".to_string(), Type::Varchar),
                Column::new("age".to_string(), Type::Integer),
            ],
            pages,
        };

        let json = serde_json::to_string(&meta).unwrap();
        let decoded: TableMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(decoded.schema().names(), vec!["name", "age"]);
    }
}

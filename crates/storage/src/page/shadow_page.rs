use super::{Page, Rows};
use shadowdb_catalog::record_id::{PageId, RecordId, SlotId, PENDING_PAGE_ID};
use shadowdb_catalog::tuple::Tuple;

/// A transaction's private copy of one page's rows.
///
/// Page id [`PENDING_PAGE_ID`] is the pending-insert buffer: rows inserted by the transaction
/// that have no home page yet.
#[derive(Debug, Clone)]
pub struct ShadowPage {
    page_id: PageId,
    rows: Rows,
    /// The rows are still exactly what was copied out of the live page.
    is_origin: bool,
    /// The rows have been exchanged into the live page by a commit, so this copy now holds the
    /// page's previous content.
    is_swap: bool,
}

impl ShadowPage {
    /// A snapshot of a live page.
    pub fn copy_of(page: &Page) -> Self {
        Self {
            page_id: page.id(),
            rows: page.rows().clone(),
            is_origin: true,
            is_swap: false,
        }
    }

    /// An empty pending-insert buffer.
    pub fn pending() -> Self {
        Self {
            page_id: PENDING_PAGE_ID,
            rows: Rows::new(),
            is_origin: false,
            is_swap: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn rows(&self) -> &Rows {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Rows {
        &mut self.rows
    }

    pub fn is_origin(&self) -> bool {
        self.is_origin
    }

    pub fn is_swap(&self) -> bool {
        self.is_swap
    }

    pub fn set_swap(&mut self, is_swap: bool) {
        self.is_swap = is_swap;
    }

    /// Replaces the row in `slot_id` (keeping its record id) and marks the copy modified.
    pub fn put(&mut self, slot_id: SlotId, mut tuple: Tuple) {
        tuple.set_record_id(RecordId::new(self.page_id, slot_id));
        self.rows.insert(slot_id, tuple);
        self.is_origin = false;
    }

    /// Removes the row in `slot_id` and marks the copy modified.
    pub fn delete(&mut self, slot_id: SlotId) -> Option<Tuple> {
        self.is_origin = false;
        self.rows.remove(&slot_id)
    }

    /// Appends an unplaced row after the highest slot in use. Only meaningful for the
    /// pending-insert buffer.
    pub fn push(&mut self, tuple: Tuple) -> SlotId {
        let slot_id = self
            .rows
            .keys()
            .next_back()
            .map_or(0, |last| last + 1);
        self.put(slot_id, tuple);
        slot_id
    }
}

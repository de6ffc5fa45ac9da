pub type PageId = u64;
pub type SlotId = u32;

/// Page id 0 never names a stored page. Tuples carrying it are unplaced: they live in a
/// transaction's pending-insert buffer and have not been assigned a home yet.
pub const PENDING_PAGE_ID: PageId = 0;

/// The first page id a table allocates.
pub const FIRST_PAGE_ID: PageId = 1;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RecordId {
    /// The ID of the page the record lives inside.
    page_id: PageId,
    /// The slot of the record within its page. Not to be confused with a byte offset!
    slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> RecordId {
        RecordId { page_id, slot_id }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn slot_id(&self) -> SlotId {
        self.slot_id
    }

    /// Whether the record still sits in a pending-insert buffer.
    pub fn is_pending(&self) -> bool {
        self.page_id == PENDING_PAGE_ID
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_id)
    }
}

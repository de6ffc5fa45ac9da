use crate::Result;
use bytes::BufMut;
use shadowdb_catalog::catalog::PageLocation;
use shadowdb_catalog::record_id::{PageId, RecordId, SlotId};
use shadowdb_catalog::schema::Schema;
use shadowdb_catalog::serde::Serde;
use shadowdb_catalog::tuple::Tuple;
use shadowdb_error::errdata;
use std::collections::BTreeMap;

pub mod shadow_page;

pub use shadow_page::ShadowPage;

/// The rows of a page keyed by slot id.
pub type Rows = BTreeMap<SlotId, Tuple>;

/// A fixed-capacity container of rows, the unit of caching and of on-disk storage.
#[derive(Debug, Clone)]
pub struct Page {
    id: PageId,
    rows: Rows,
    /// The maximum number of rows the page holds.
    capacity: usize,
    /// Where the page's last flushed image lives, if it has one.
    location: Option<PageLocation>,
    /// Whether the in-memory rows differ from the on-disk image.
    dirty: bool,
}

impl Page {
    pub fn new(id: PageId, capacity: usize) -> Self {
        Self {
            id,
            rows: Rows::new(),
            capacity,
            location: None,
            dirty: false,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn location(&self) -> Option<PageLocation> {
        self.location
    }

    pub fn set_location(&mut self, location: PageLocation) {
        self.location = Some(location);
    }

    pub fn rows(&self) -> &Rows {
        &self.rows
    }

    pub fn get(&self, slot_id: SlotId) -> Option<&Tuple> {
        self.rows.get(&slot_id)
    }

    /// Stores the tuple in the lowest free slot, stamping it with its new record id. Returns
    /// `None` when every slot is taken.
    pub fn insert(&mut self, mut tuple: Tuple) -> Option<SlotId> {
        if self.is_full() {
            return None;
        }
        let slot_id = (0..)
            .find(|slot| !self.rows.contains_key(slot))
            .unwrap_or_default();
        tuple.set_record_id(RecordId::new(self.id, slot_id));
        self.rows.insert(slot_id, tuple);
        self.dirty = true;
        Some(slot_id)
    }

    /// Clears a slot, returning the tuple it held.
    pub fn remove(&mut self, slot_id: SlotId) -> Option<Tuple> {
        let removed = self.rows.remove(&slot_id);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Exchanges this page's rows with `rows`. This is how a transaction's shadow copy is
    /// installed as the live content, and how it is taken back out again.
    pub fn swap_rows(&mut self, rows: &mut Rows) {
        std::mem::swap(&mut self.rows, rows);
        self.dirty = true;
    }

    /// Encodes the occupied slots in ascending slot order, each as `[8-byte LE length][row]`.
    /// An empty page encodes to no bytes at all.
    pub fn encode(&self, schema: &Schema) -> Vec<u8> {
        let mut bytes = Vec::new();
        for tuple in self.rows.values() {
            let row = Serde::serialize(tuple, schema);
            bytes.put_u64_le(row.len() as u64);
            bytes.put_slice(&row);
        }
        bytes
    }

    /// Rebuilds a page from its encoding. Rows are re-inserted first-fit, so their slot ids
    /// come back as `0..n` regardless of the gaps the page had when it was written.
    pub fn decode(id: PageId, bytes: &[u8], schema: &Schema, capacity: usize) -> Result<Self> {
        let mut page = Page::new(id, capacity);
        let mut rest = bytes;
        while !rest.is_empty() {
            let (row, tail) = Serde::split_prefixed(rest)?;
            let tuple = Serde::deserialize(row, schema)?;
            if page.insert(tuple).is_none() {
                return errdata!("page {} holds more than {} rows", id, capacity);
            }
            rest = tail;
        }
        page.dirty = false;
        Ok(page)
    }
}

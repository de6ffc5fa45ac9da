use crate::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

pub mod file_backend;
pub mod mmap_backend;

pub use file_backend::FileBackend;
pub use mmap_backend::MmapBackend;

/// The default pre-sized capacity of a memory-mapped data file.
pub const DEFAULT_MMAP_SIZE: u64 = 16 * 1024 * 1024;

/// How a table's data file is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    /// Positioned reads and writes on a plain file.
    #[default]
    Standard,
    /// A writable memory map over a file pre-sized to a fixed capacity.
    Mmap,
}

/// Random-access durable storage for encoded pages.
///
/// Space is allocated append-only: every write goes to the logical end of the data and the
/// backend reports where it put it. Superseded page images stay in place until the table is
/// compacted.
pub trait StorageBackend: Send + Sync + Debug {
    /// Appends `data` at the logical end, returning the offset it was written at.
    fn append(&mut self, data: &[u8]) -> Result<u64>;

    /// Reads `len` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, len: u64) -> Result<Bytes>;

    /// Flushes written data to durable storage.
    fn sync(&mut self) -> Result<()>;

    /// Flushes and releases the underlying file. Further calls other than `close` fail.
    fn close(&mut self) -> Result<()>;

    /// The logical length of the stored data.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The path of the backing file.
    fn path(&self) -> &Path;
}

/// Opens (creating if needed) the data file at `path` with the requested access mode.
pub fn open_backend(
    path: &Path,
    mode: IoMode,
    mmap_size: u64,
) -> Result<Box<dyn StorageBackend>> {
    Ok(match mode {
        IoMode::Standard => Box::new(FileBackend::open(path)?),
        IoMode::Mmap => Box::new(MmapBackend::open(path, mmap_size)?),
    })
}

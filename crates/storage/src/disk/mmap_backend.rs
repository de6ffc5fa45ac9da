use super::StorageBackend;
use crate::Result;
use bytes::Bytes;
use fs2::FileExt;
use memmap2::MmapMut;
use shadowdb_error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A data file accessed through a writable memory map.
///
/// The file is extended to `capacity` bytes up front and mapped whole. `cursor` marks the
/// logical end of the data; on close the file is truncated back to it, so a reopened file's
/// length is exactly its data.
#[derive(Debug)]
pub struct MmapBackend {
    file: Option<File>,
    map: Option<MmapMut>,
    path: PathBuf,
    cursor: u64,
    capacity: u64,
}

impl MmapBackend {
    pub fn open(path: &Path, size: u64) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::IO(format!("Unable to open file {}: {}", path.display(), e)))?;
        file.try_lock_exclusive().map_err(|e| {
            Error::IO(format!(
                "Failed to acquire exclusive file lock on {}: {}",
                path.display(),
                e
            ))
        })?;

        let cursor = file.metadata()?.len();
        // A zero-length map is not allowed.
        let capacity = size.max(cursor).max(1);
        file.set_len(capacity)?;
        let map = Self::map(&file)?;

        Ok(Self {
            file: Some(file),
            map: Some(map),
            path: path.to_path_buf(),
            cursor,
            capacity,
        })
    }

    fn map(file: &File) -> Result<MmapMut> {
        // SAFETY: the file is held under an exclusive lock for as long as the map exists, so
        // no other handle resizes or rewrites it underneath us.
        let map = unsafe { MmapMut::map_mut(file)? };
        Ok(map)
    }

    fn closed(&self) -> Error {
        Error::IO(format!("{} is closed", self.path.display()))
    }

    /// Grows the file (at least doubling it) and remaps it so that `needed` bytes fit.
    fn grow(&mut self, needed: u64) -> Result<()> {
        let capacity = needed.max(self.capacity.saturating_mul(2));
        if let Some(map) = self.map.take() {
            map.flush()?;
        }
        let file = self.file.as_ref().ok_or_else(|| self.closed())?;
        file.set_len(capacity)?;
        self.map = Some(Self::map(file)?);
        tracing::debug!(path = %self.path.display(), capacity, "grew mapped data file");
        self.capacity = capacity;
        Ok(())
    }
}

impl StorageBackend for MmapBackend {
    fn append(&mut self, data: &[u8]) -> Result<u64> {
        if self.file.is_none() {
            return Err(self.closed());
        }
        let offset = self.cursor;
        let end = offset + data.len() as u64;
        if end > self.capacity {
            self.grow(end)?;
        }
        let map = self.map.as_mut().ok_or_else(|| Error::IO("map missing".to_string()))?;
        map[usize::try_from(offset)?..usize::try_from(end)?].copy_from_slice(data);
        self.cursor = end;
        Ok(offset)
    }

    fn read_at(&mut self, offset: u64, len: u64) -> Result<Bytes> {
        let Some(map) = self.map.as_ref() else {
            return Err(self.closed());
        };
        let end = offset + len;
        if end > self.cursor {
            return Err(Error::IO(format!(
                "read of {} bytes at {} past the end of {} ({} bytes)",
                len,
                offset,
                self.path.display(),
                self.cursor
            )));
        }
        Ok(Bytes::copy_from_slice(
            &map[usize::try_from(offset)?..usize::try_from(end)?],
        ))
    }

    fn sync(&mut self) -> Result<()> {
        match self.map.as_ref() {
            Some(map) => Ok(map.flush()?),
            None => Err(self.closed()),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(map) = self.map.take() {
            map.flush()?;
        }
        if let Some(file) = self.file.take() {
            file.set_len(self.cursor)?;
            file.sync_all()?;
            FileExt::unlock(&file)?;
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.cursor
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MmapBackend {
    /// Trims the file back to its data and releases the lock if the backend was never closed.
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to close mapped data file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_is_presized_then_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.data");

        let mut backend = MmapBackend::open(&path, 4096).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
        backend.append(&[7; 100]).unwrap();
        backend.close().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 100);
    }

    #[test]
    fn test_append_beyond_capacity_grows() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MmapBackend::open(&dir.path().join("t.data"), 16).unwrap();

        let payload: Vec<u8> = (0..100u8).collect();
        assert_eq!(backend.append(&payload[..10]).unwrap(), 0);
        assert_eq!(backend.append(&payload[10..]).unwrap(), 10);
        assert_eq!(&backend.read_at(0, 100).unwrap()[..], &payload[..]);
        assert!(backend.read_at(90, 20).is_err());
    }
}

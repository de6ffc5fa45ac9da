use super::StorageBackend;
use crate::Result;
use bytes::{Bytes, BytesMut};
use fs2::FileExt;
use shadowdb_error::Error;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A data file accessed with positioned reads and appends.
#[derive(Debug)]
pub struct FileBackend {
    /// `None` once the backend has been closed.
    file: Option<File>,
    path: PathBuf,
    /// The logical end of the data, where the next append lands.
    len: u64,
}

impl FileBackend {
    /// Opens or creates the data file at `path`. The file is locked exclusively for as long as
    /// the backend stays open.
    pub fn open(path: &Path) -> Result<Self> {
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

        let len = file.metadata()?.len();
        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            len,
        })
    }

    fn file(&mut self) -> Result<&mut File> {
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(Error::IO(format!("{} is closed", self.path.display()))),
        }
    }
}

impl StorageBackend for FileBackend {
    fn append(&mut self, data: &[u8]) -> Result<u64> {
        let offset = self.len;
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        self.len += data.len() as u64;
        Ok(offset)
    }

    fn read_at(&mut self, offset: u64, len: u64) -> Result<Bytes> {
        if offset + len > self.len {
            return Err(Error::IO(format!(
                "read of {} bytes at {} past the end of {} ({} bytes)",
                len,
                offset,
                self.path.display(),
                self.len
            )));
        }
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = BytesMut::zeroed(usize::try_from(len)?);
        file.read_exact(&mut bytes)?;
        Ok(bytes.freeze())
    }

    fn sync(&mut self) -> Result<()> {
        self.file()?.sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            FileExt::unlock(&file)?;
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileBackend {
    /// Releases the exclusive lock if the backend was never closed explicitly.
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to unlock data file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_open_is_refused_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.data");

        let mut first = FileBackend::open(&path).unwrap();
        assert!(matches!(FileBackend::open(&path), Err(Error::IO(_))));

        first.close().unwrap();
        assert!(FileBackend::open(&path).is_ok());
    }

    #[test]
    fn test_closed_backend_rejects_io() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::open(&dir.path().join("t.data")).unwrap();
        backend.append(b"abc").unwrap();
        backend.close().unwrap();

        assert!(backend.append(b"d").is_err());
        assert!(backend.read_at(0, 1).is_err());
        // Closing twice is harmless.
        backend.close().unwrap();
    }

    #[test]
    fn test_read_past_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::open(&dir.path().join("t.data")).unwrap();
        backend.append(b"abc").unwrap();
        assert!(backend.read_at(2, 2).is_err());
        assert_eq!(&backend.read_at(1, 2).unwrap()[..], b"bc");
    }
}

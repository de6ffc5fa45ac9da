use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// An append-only record of every accepted update, one statement batch per line.
///
/// The record is written before the batch is applied and synced after each append. It is
/// never read back; a clean close deletes it.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl Wal {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
        })
    }

    pub fn append(&self, text: &str) -> Result<()> {
        let mut guard = self.file.lock()?;
        let Some(file) = guard.as_mut() else {
            return shadowdb_error::errinput!("write-ahead log {} is closed", self.path.display());
        };
        file.write_all(text.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_data()?;
        Ok(())
    }

    /// Closes the log and removes its file.
    pub fn remove(&self) -> Result<()> {
        self.file.lock()?.take();
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

use crate::Result;
use serde::Deserialize;
use shadowdb_execution::registry::FunctionRegistry;
use shadowdb_storage::disk::{IoMode, DEFAULT_MMAP_SIZE};
use shadowdb_storage::table::TableOptions;
use std::path::{Path, PathBuf};

/// Process-wide settings: where databases live, how their tables are stored, and the
/// functions statements may call.
///
/// Everything but the functions can be loaded from a JSON file; missing keys take their
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// The directory holding one subdirectory per database.
    pub root: PathBuf,
    pub io_mode: IoMode,
    /// Initial size of a memory-mapped data file, in bytes.
    pub mmap_size: u64,
    /// Resident pages per table.
    pub max_pages: usize,
    /// Rows per page.
    pub max_rows: usize,
    /// Databases take a copy of this registry when they are opened.
    #[serde(skip)]
    pub functions: FunctionRegistry,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            io_mode: IoMode::Standard,
            mmap_size: DEFAULT_MMAP_SIZE,
            max_pages: 4,
            max_rows: 4,
            functions: FunctionRegistry::with_builtins(),
        }
    }
}

impl Options {
    /// Default options rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Reads options from a JSON file, e.g. `{"root": "/var/lib/shadowdb", "io_mode": "mmap"}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|err| {
            shadowdb_error::Error::InvalidInput(format!("invalid options {}: {err}", path.display()))
        })
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            io_mode: self.io_mode,
            mmap_size: self.mmap_size,
            max_pages: self.max_pages,
            max_rows: self.max_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"root": "/tmp/db", "io_mode": "mmap", "max_rows": 16}"#).unwrap();

        let options = Options::from_file(&path).unwrap();
        assert_eq!(options.root, PathBuf::from("/tmp/db"));
        assert_eq!(options.io_mode, IoMode::Mmap);
        assert_eq!(options.max_rows, 16);
        assert_eq!(options.max_pages, 4);
        assert_eq!(options.mmap_size, DEFAULT_MMAP_SIZE);
        assert!(options.functions.aggregate("sum").is_ok());
    }

    #[test]
    fn test_from_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"io_mode": "tape"}"#).unwrap();
        assert!(Options::from_file(&path).is_err());
        assert!(Options::from_file(&dir.path().join("missing.json")).is_err());
    }
}

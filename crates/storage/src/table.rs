use crate::buffer_pool::BufferPool;
use crate::disk::{open_backend, IoMode, DEFAULT_MMAP_SIZE};
use crate::Result;
use shadowdb_catalog::catalog::{PageCatalog, PageLocation, TableMeta};
use shadowdb_catalog::column::Column;
use shadowdb_catalog::schema::{Schema, SchemaRef};
use shadowdb_error::errinput;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// The storage settings every table of a database is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub io_mode: IoMode,
    pub mmap_size: u64,
    /// Resident pages per table.
    pub max_pages: usize,
    /// Rows per page.
    pub max_rows: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            io_mode: IoMode::Standard,
            mmap_size: DEFAULT_MMAP_SIZE,
            max_pages: 4,
            max_rows: 4,
        }
    }
}

/// A named relation: its buffer pool (which owns the schema, page catalog and data file) behind
/// a single read/write lock, plus a flag recording whether anything was committed to it since
/// it was opened.
#[derive(Debug)]
pub struct Table {
    name: String,
    dir: PathBuf,
    options: TableOptions,
    pool: RwLock<BufferPool>,
    modified: AtomicBool,
}

impl Table {
    /// Creates a new, empty table whose data file lives in `dir`.
    pub fn create(dir: &Path, name: &str, schema: Schema, options: TableOptions) -> Result<Self> {
        let path = Self::data_path(dir, name);
        if path.exists() {
            return errinput!("table {name} already exists");
        }
        let meta = TableMeta {
            name: name.to_string(),
            columns: schema.columns().clone(),
            pages: PageCatalog::new(),
        };
        let table = Self::open(dir, meta, options)?;
        tracing::info!(table = name, "created table");
        Ok(table)
    }

    /// Opens a table from its persisted metadata.
    pub fn open(dir: &Path, meta: TableMeta, options: TableOptions) -> Result<Self> {
        let schema = Arc::new(meta.schema());
        let backend = open_backend(
            &Self::data_path(dir, &meta.name),
            options.io_mode,
            options.mmap_size,
        )?;
        let pool = BufferPool::new(
            schema,
            backend,
            meta.pages,
            options.max_pages,
            options.max_rows,
        );
        Ok(Self {
            name: meta.name,
            dir: dir.to_path_buf(),
            options,
            pool: RwLock::new(pool),
            modified: AtomicBool::new(false),
        })
    }

    pub fn data_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.data"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lock every reader and writer of the table's pages goes through.
    pub fn pool(&self) -> &RwLock<BufferPool> {
        &self.pool
    }

    pub fn schema(&self) -> Result<SchemaRef> {
        Ok(self.pool.read()?.schema().clone())
    }

    /// Appends a column to the table. Rows stored before the change read back with the
    /// column's default.
    pub fn add_column(&self, column: Column) -> Result<()> {
        let mut pool = self.pool.write()?;
        let mut schema = Schema::clone(pool.schema());
        schema.add_column(column)?;
        pool.set_schema(Arc::new(schema));
        self.mark_modified();
        Ok(())
    }

    pub fn mark_modified(&self) {
        self.modified.store(true, Ordering::Release);
    }

    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    /// The table's current metadata record.
    pub fn meta(&self) -> Result<TableMeta> {
        let pool = self.pool.read()?;
        Ok(TableMeta {
            name: self.name.clone(),
            columns: pool.schema().columns().clone(),
            pages: pool.catalog().clone(),
        })
    }

    /// Writes every resident page back, compacts the data file if the table was modified, and
    /// releases the data file. Returns the metadata to persist.
    pub fn close(&self) -> Result<TableMeta> {
        let mut pool = self.pool.write()?;
        pool.flush_all()?;
        if self.modified.swap(false, Ordering::AcqRel) {
            self.compact(&mut pool)?;
        }
        pool.backend_mut().close()?;
        Ok(TableMeta {
            name: self.name.clone(),
            columns: pool.schema().columns().clone(),
            pages: pool.catalog().clone(),
        })
    }

    /// Rewrites the data file so that it holds exactly one image per catalogued page.
    ///
    /// Pages are copied in page-id order into `<name>.tmp`, which then atomically replaces the
    /// data file. Superseded images and zero-length entries are dropped. Every page must
    /// already be flushed.
    fn compact(&self, pool: &mut BufferPool) -> Result<()> {
        let data_path = Self::data_path(&self.dir, &self.name);
        let tmp_path = self.dir.join(format!("{}.tmp", self.name));
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path)?;
        }

        let before = pool.backend_mut().len();
        let mut tmp = open_backend(&tmp_path, IoMode::Standard, 0)?;
        let mut catalog = PageCatalog::new();
        let entries: Vec<_> = pool
            .catalog()
            .iter()
            .filter(|(_, location)| location.length > 0)
            .collect();
        for (page_id, location) in entries {
            let bytes = pool
                .backend_mut()
                .read_at(location.offset, location.length)?;
            let offset = tmp.append(&bytes)?;
            catalog.insert(
                page_id,
                PageLocation {
                    offset,
                    length: location.length,
                },
            );
        }
        let after = tmp.len();
        tmp.close()?;

        pool.backend_mut().close()?;
        std::fs::rename(&tmp_path, &data_path)?;
        let backend = open_backend(&data_path, self.options.io_mode, self.options.mmap_size)?;
        pool.replace_storage(catalog, backend)?;

        tracing::info!(
            table = %self.name,
            pages = pool.catalog().len(),
            before,
            after,
            "compacted table"
        );
        Ok(())
    }

    /// Releases the data file and deletes it.
    pub fn drop_files(&self) -> Result<()> {
        let mut pool = self.pool.write()?;
        pool.backend_mut().close()?;
        let path = Self::data_path(&self.dir, &self.name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        tracing::info!(table = %self.name, "dropped table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{row, schema};
    use shadowdb_catalog::field::Field;
    use shadowdb_catalog::types::Type;

    fn options(io_mode: IoMode) -> TableOptions {
        TableOptions {
            io_mode,
            mmap_size: 1024,
            max_pages: 2,
            max_rows: 2,
        }
    }

    /// Puts `n` rows into a table, two per page, through the pool.
    fn populate(table: &Table, n: i64) {
        let mut pool = table.pool().write().unwrap();
        for i in 0..n {
            let last = pool.last_page_id();
            let page = match last {
                Some(id) if !pool.get_page(id).unwrap().unwrap().is_full() => {
                    pool.get_page(id).unwrap().unwrap()
                }
                _ => pool.new_page().unwrap(),
            };
            page.insert(row(&format!("r{i}"), i));
        }
        drop(pool);
        table.mark_modified();
    }

    fn all_ages(table: &Table) -> Vec<i64> {
        let mut pool = table.pool().write().unwrap();
        let mut ages = vec![];
        for id in 1..pool.next_page_id() {
            if let Some(page) = pool.get_page(id).unwrap() {
                for tuple in page.rows().values() {
                    ages.push(tuple.field("age").unwrap().as_i64().unwrap());
                }
            }
        }
        ages.sort();
        ages
    }

    #[test]
    fn test_close_and_reopen() {
        for mode in [IoMode::Standard, IoMode::Mmap] {
            let dir = tempfile::tempdir().unwrap();
            let table = Table::create(dir.path(), "test", schema(), options(mode)).unwrap();
            populate(&table, 7);
            let meta = table.close().unwrap();
            drop(table);

            assert_eq!(meta.pages.len(), 4);
            let table = Table::open(dir.path(), meta, options(mode)).unwrap();
            assert_eq!(all_ages(&table), (0..7).collect::<Vec<_>>());
            assert_eq!(table.pool().read().unwrap().next_page_id(), 5);
        }
    }

    #[test]
    fn test_compaction_drops_superseded_images() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::create(dir.path(), "test", schema(), options(IoMode::Standard)).unwrap();
        populate(&table, 8);

        // Rewrite every page a few times so the file accumulates stale images.
        for round in 0..3 {
            let mut pool = table.pool().write().unwrap();
            for id in 1..=4 {
                let page = pool.get_page(id).unwrap().unwrap();
                page.remove(0);
                page.insert(row("again", 100 + round));
            }
            pool.flush_all().unwrap();
        }
        let bloated = std::fs::metadata(Table::data_path(dir.path(), "test"))
            .unwrap()
            .len();

        let meta = table.close().unwrap();
        let compacted = std::fs::metadata(Table::data_path(dir.path(), "test"))
            .unwrap()
            .len();
        assert!(compacted < bloated);
        let total: u64 = meta.pages.iter().map(|(_, l)| l.length).sum();
        assert_eq!(compacted, total);
        assert!(!dir.path().join("test.tmp").exists());
    }

    #[test]
    fn test_add_column() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::create(dir.path(), "test", schema(), options(IoMode::Standard)).unwrap();
        populate(&table, 3);
        table.pool().write().unwrap().flush_all().unwrap();

        table
            .add_column(Column::with_default("city".to_string(), "nowhere".into()))
            .unwrap();
        assert!(table
            .add_column(Column::new("age".to_string(), Type::Integer))
            .is_err());

        let mut pool = table.pool().write().unwrap();
        let page = pool.get_page(1).unwrap().unwrap();
        assert_eq!(
            page.get(0).unwrap().field("city"),
            Ok(Field::Varchar("nowhere".into()))
        );
    }

    #[test]
    fn test_create_twice() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::create(dir.path(), "test", schema(), TableOptions::default()).unwrap();
        assert!(Table::create(dir.path(), "test", schema(), TableOptions::default()).is_err());
        table.drop_files().unwrap();
        assert!(!Table::data_path(dir.path(), "test").exists());
    }
}

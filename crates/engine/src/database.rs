use crate::options::Options;
use crate::sql::is_identifier;
use crate::transaction::Transaction;
use crate::wal::Wal;
use crate::Result;
use shadowdb_catalog::catalog::TableMeta;
use shadowdb_catalog::column::Column;
use shadowdb_catalog::schema::{Schema, SchemaRef};
use shadowdb_error::{errinput, Error};
use shadowdb_execution::registry::FunctionRegistry;
use shadowdb_execution::result::ResultSet;
use shadowdb_storage::table::{Table, TableOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

pub const CATALOG_FILE: &str = "catalog.json";
pub const WAL_FILE: &str = "wal.log";

/// A directory of tables, with the function registry its statements are compiled against and
/// the write-ahead log its updates are recorded in.
///
/// Table metadata (columns and page catalogs) is kept in `catalog.json`, rewritten whenever a
/// table is created, altered or dropped and when the database is closed.
#[derive(Debug)]
pub struct Database {
    name: String,
    dir: PathBuf,
    table_options: TableOptions,
    functions: FunctionRegistry,
    tables: RwLock<BTreeMap<String, Arc<Table>>>,
    wal: Wal,
    /// Shared by every database of an instance; serializes creating, dropping, opening and
    /// closing.
    lifecycle: Arc<Mutex<()>>,
    closed: AtomicBool,
}

impl Database {
    /// Creates an empty database in `<root>/<name>`.
    pub(crate) fn create(name: &str, options: &Options, lifecycle: Arc<Mutex<()>>) -> Result<Self> {
        if !is_identifier(name) {
            return errinput!("invalid database name {name:?}");
        }
        let dir = options.root.join(name);
        if dir.exists() {
            return errinput!("database {name} already exists");
        }
        std::fs::create_dir_all(&dir)?;
        let db = Self::new(name, dir, options, BTreeMap::new(), lifecycle)?;
        db.save_catalog()?;
        info!(database = name, "created database");
        Ok(db)
    }

    /// Opens the database in `<root>/<name>`.
    pub(crate) fn open(name: &str, options: &Options, lifecycle: Arc<Mutex<()>>) -> Result<Self> {
        let dir = options.root.join(name);
        if !dir.is_dir() {
            return errinput!("database {name} does not exist");
        }
        let mut tables = BTreeMap::new();
        for (table_name, meta) in read_catalog(&dir)? {
            let table = Table::open(&dir, meta, options.table_options())?;
            tables.insert(table_name, Arc::new(table));
        }
        let db = Self::new(name, dir, options, tables, lifecycle)?;
        info!(database = name, tables = db.table_names()?.len(), "opened database");
        Ok(db)
    }

    fn new(
        name: &str,
        dir: PathBuf,
        options: &Options,
        tables: BTreeMap<String, Arc<Table>>,
        lifecycle: Arc<Mutex<()>>,
    ) -> Result<Self> {
        let wal = Wal::open(&dir.join(WAL_FILE))?;
        Ok(Self {
            name: name.to_string(),
            dir,
            table_options: options.table_options(),
            functions: options.functions.clone(),
            tables: RwLock::new(tables),
            wal,
            lifecycle,
            closed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The functions statements on this database may call: a copy of the instance's registry
    /// taken when the database was opened.
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub(crate) fn wal(&self) -> &Wal {
        &self.wal
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return errinput!("database {} is closed", self.name);
        }
        Ok(())
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.read()?.keys().cloned().collect())
    }

    pub fn table(&self, name: &str) -> Result<Arc<Table>> {
        match self.tables.read()?.get(name) {
            Some(table) => Ok(table.clone()),
            None => errinput!("unknown table {name}"),
        }
    }

    pub fn schema(&self, table: &str) -> Result<SchemaRef> {
        self.table(table)?.schema()
    }

    pub fn create_table(&self, name: &str, columns: Vec<Column>) -> Result<()> {
        let _lifecycle = self.lifecycle.lock()?;
        self.check_open()?;
        if !is_identifier(name) {
            return errinput!("invalid table name {name:?}");
        }
        let mut schema = Schema::default();
        for column in columns {
            if !is_identifier(column.name()) {
                return errinput!("invalid column name {:?}", column.name());
            }
            schema.add_column(column)?;
        }

        let mut tables = self.tables.write()?;
        if tables.contains_key(name) {
            return errinput!("table {name} already exists");
        }
        let table = Table::create(&self.dir, name, schema, self.table_options)?;
        tables.insert(name.to_string(), Arc::new(table));
        drop(tables);
        self.save_catalog()
    }

    /// Appends a column to a table. Existing rows read back with the column's default.
    pub fn add_column(&self, table: &str, column: Column) -> Result<()> {
        let _lifecycle = self.lifecycle.lock()?;
        self.check_open()?;
        if !is_identifier(column.name()) {
            return errinput!("invalid column name {:?}", column.name());
        }
        self.table(table)?.add_column(column)?;
        self.save_catalog()
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        let _lifecycle = self.lifecycle.lock()?;
        self.check_open()?;
        let Some(table) = self.tables.write()?.remove(name) else {
            return errinput!("unknown table {name}");
        };
        table.drop_files()?;
        self.save_catalog()
    }

    /// Starts a transaction over the tables that exist now.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        self.check_open()?;
        let tables = self.tables.read()?.clone();
        Ok(Transaction::begin(self, tables))
    }

    /// Runs a select statement in a transaction of its own.
    pub fn query(&self, sql: &str) -> Result<ResultSet> {
        let mut txn = self.begin()?;
        let result = txn.query(sql)?;
        txn.commit()?;
        Ok(result)
    }

    /// Applies a batch of updates in a transaction of its own, rolling it back if the commit
    /// fails.
    pub fn update(&self, sql: &str) -> Result<()> {
        let mut txn = self.begin()?;
        txn.update(sql)?;
        if let Err(err) = txn.commit() {
            txn.rollback()?;
            return Err(err);
        }
        Ok(())
    }

    /// Writes back and compacts every table, saves the catalog and removes the write-ahead
    /// log. The database cannot be used afterwards.
    pub fn close(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock()?;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut metas = BTreeMap::new();
        for (name, table) in self.tables.read()?.iter() {
            metas.insert(name.clone(), table.close()?);
        }
        write_catalog(&self.dir, &metas)?;
        self.wal.remove()?;
        info!(database = %self.name, tables = metas.len(), "closed database");
        Ok(())
    }

    fn save_catalog(&self) -> Result<()> {
        let mut metas = BTreeMap::new();
        for (name, table) in self.tables.read()?.iter() {
            metas.insert(name.clone(), table.meta()?);
        }
        write_catalog(&self.dir, &metas)
    }
}

fn read_catalog(dir: &Path) -> Result<BTreeMap<String, TableMeta>> {
    let path = dir.join(CATALOG_FILE);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let bytes = std::fs::read(&path)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| Error::InvalidData(format!("corrupt catalog {}: {err}", path.display())))
}

/// Replaces the catalog file atomically.
fn write_catalog(dir: &Path, metas: &BTreeMap<String, TableMeta>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(metas)
        .map_err(|err| Error::InvalidData(format!("cannot encode catalog: {err}")))?;
    let tmp = dir.join(format!("{CATALOG_FILE}.tmp"));
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, dir.join(CATALOG_FILE))?;
    Ok(())
}

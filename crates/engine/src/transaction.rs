use crate::database::Database;
use crate::planner::plan_select;
use crate::sql::{check_parentheses, parse_literal, split_statements, Mutation, Select};
use crate::Result;
use shadowdb_catalog::record_id::{PageId, RecordId, FIRST_PAGE_ID, PENDING_PAGE_ID};
use shadowdb_catalog::schema::Schema;
use shadowdb_catalog::tuple::{Cell, Tuple};
use shadowdb_error::{errinput, errtxn, Error};
use shadowdb_execution::result::ResultSet;
use shadowdb_execution::scan::ScanSource;
use shadowdb_storage::buffer_pool::BufferPool;
use shadowdb_storage::page::ShadowPage;
use shadowdb_storage::table::Table;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
    /// A commit failed part way. Only rollback is possible.
    Failed,
}

/// One transaction's private view of one table: copies of the pages it has read or modified,
/// and the rows it has inserted but not yet placed (page [`PENDING_PAGE_ID`]).
#[derive(Debug)]
struct ShadowSet {
    table: Arc<Table>,
    pages: BTreeMap<PageId, ShadowPage>,
}

impl ShadowSet {
    fn new(table: Arc<Table>) -> Self {
        let mut pages = BTreeMap::new();
        pages.insert(PENDING_PAGE_ID, ShadowPage::pending());
        Self { table, pages }
    }

    fn pending(&mut self) -> Result<&mut ShadowPage> {
        self.pages
            .get_mut(&PENDING_PAGE_ID)
            .ok_or_else(|| Error::Transaction("pending-insert page is missing".to_string()))
    }

    /// The shadow of a page, copying the live page on first use.
    fn shadow(&mut self, pool: &mut BufferPool, page_id: PageId) -> Result<&mut ShadowPage> {
        if !self.pages.contains_key(&page_id) {
            let copy = pool.copy_page(page_id)?.ok_or_else(|| {
                Error::BufferPoolError(format!("page {page_id} of {} is gone", self.table.name()))
            })?;
            self.pages.insert(page_id, copy);
        }
        self.pages
            .get_mut(&page_id)
            .ok_or_else(|| Error::BufferPoolError(format!("page {page_id} has no shadow")))
    }

    /// Installs every modified shadow page as the live page and places the pending rows.
    fn merge(&mut self) -> Result<()> {
        let table = self.table.clone();
        let mut pool = table.pool().write()?;
        let mut changed = false;

        for (page_id, shadow) in self.pages.iter_mut() {
            if *page_id == PENDING_PAGE_ID || shadow.is_origin() {
                continue;
            }
            pool.live_page(*page_id)?.swap_rows(shadow.rows_mut());
            shadow.set_swap(true);
            changed = true;
        }

        for row in self.pending()?.rows_mut().values_mut() {
            let reusable = match pool.last_page_id() {
                Some(id) => (!pool.live_page(id)?.is_full()).then_some(id),
                None => None,
            };
            let target = match reusable {
                Some(id) => id,
                None => pool.new_page()?.id(),
            };
            let slot_id = pool.live_page(target)?.insert(row.clone()).ok_or_else(|| {
                Error::BufferPoolError(format!("page {target} has no free slot"))
            })?;
            row.set_record_id(RecordId::new(target, slot_id));
            changed = true;
        }

        if changed {
            table.mark_modified();
        }
        Ok(())
    }

    /// Reverts whatever `merge` got done: removes every placed row, then swaps the previous
    /// content back into every swapped page. Placed rows go first because a placement may
    /// reuse a slot that the swapped-out content still occupies.
    fn undo(&mut self) -> Result<()> {
        let table = self.table.clone();
        let mut pool = table.pool().write()?;

        for (slot_id, row) in self.pending()?.rows_mut().iter_mut() {
            let rid = row.record_id();
            if !rid.is_pending() {
                pool.live_page(rid.page_id())?.remove(rid.slot_id());
                row.set_record_id(RecordId::new(PENDING_PAGE_ID, *slot_id));
            }
        }

        for (page_id, shadow) in self.pages.iter_mut() {
            if shadow.is_swap() {
                pool.live_page(*page_id)?.swap_rows(shadow.rows_mut());
                shadow.set_swap(false);
            }
        }
        Ok(())
    }
}

/// Fills in columns added to the table after the row was loaded.
fn with_defaults(mut row: Tuple, schema: &Schema) -> Tuple {
    for column in schema.columns() {
        if !row.contains(column.name()) {
            row.set(
                column.name(),
                Cell::new(column.field_type(), column.default_bytes().clone()),
            );
        }
    }
    row
}

impl ScanSource for ShadowSet {
    /// Emits the table as this transaction sees it: every allocated page in id order, read
    /// from its shadow if there is one and from the buffer pool otherwise, then the pending
    /// inserts. The table lock is held while the pages are read.
    fn scan(&self, emit: &mut dyn FnMut(Tuple) -> bool) -> Result<()> {
        let mut pool = self.table.pool().write()?;
        let schema = pool.schema().clone();
        for page_id in FIRST_PAGE_ID..pool.next_page_id() {
            let rows: Vec<Tuple> = match self.pages.get(&page_id) {
                Some(shadow) => shadow.rows().values().cloned().collect(),
                None => match pool.get_page(page_id)? {
                    Some(page) => page.rows().values().cloned().collect(),
                    None => continue,
                },
            };
            for row in rows {
                if !emit(with_defaults(row, &schema)) {
                    return Ok(());
                }
            }
        }
        drop(pool);

        if let Some(pending) = self.pages.get(&PENDING_PAGE_ID) {
            for row in pending.rows().values() {
                if !emit(with_defaults(row.clone(), &schema)) {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// A mutation checked against the schema and registry, ready to apply.
enum Bound {
    Insert { table: String, row: Tuple },
    Update { select: Select, assignments: Vec<(String, Cell)> },
    Delete { select: Select },
}

/// A unit of work over a database.
///
/// Reads see the live tables except for pages the transaction has already looked at or
/// modified, which it keeps private copies of (shadow pages). Writes only touch shadow pages
/// until commit, which swaps them into the live tables. Tables created after `begin` are not
/// visible.
pub struct Transaction<'db> {
    db: &'db Database,
    sets: BTreeMap<String, ShadowSet>,
    is_update: bool,
    state: TransactionState,
}

impl<'db> Transaction<'db> {
    pub(crate) fn begin(db: &'db Database, tables: BTreeMap<String, Arc<Table>>) -> Self {
        let sets = tables
            .into_iter()
            .map(|(name, table)| (name, ShadowSet::new(table)))
            .collect();
        Self {
            db,
            sets,
            is_update: false,
            state: TransactionState::Active,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Whether an update has been applied in this transaction.
    pub fn is_update(&self) -> bool {
        self.is_update
    }

    fn check_state(&self, allowed: &[TransactionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            errtxn!("transaction is {:?}", self.state)
        }
    }

    fn set(&self, table: &str) -> Result<&ShadowSet> {
        match self.sets.get(table) {
            Some(set) => Ok(set),
            None => errinput!("unknown table {table}"),
        }
    }

    fn set_mut(&mut self, table: &str) -> Result<&mut ShadowSet> {
        match self.sets.get_mut(table) {
            Some(set) => Ok(set),
            None => errinput!("unknown table {table}"),
        }
    }

    fn run_select(&self, select: &Select) -> Result<ResultSet> {
        let set = self.set(&select.table)?;
        let schema = set.table.schema()?;
        plan_select(select, set, &schema, self.db.functions())?.execute()
    }

    /// Runs a select statement.
    ///
    /// Every page a result row came from is then copied into the transaction (unless it
    /// already has a copy), so repeating the query sees those rows unchanged even if other
    /// transactions commit in the meantime.
    pub fn query(&mut self, sql: &str) -> Result<ResultSet> {
        self.check_state(&[TransactionState::Active])?;
        let sql = sql.trim().trim_end_matches(';');
        if !check_parentheses(sql) {
            return errinput!("unbalanced parentheses in {sql:?}");
        }
        let select = Select::parse(sql)?;
        let result = self.run_select(&select)?;

        let pages: HashSet<PageId> = result
            .rows()
            .iter()
            .map(|row| row.record_id().page_id())
            .filter(|page_id| *page_id != PENDING_PAGE_ID)
            .collect();
        let set = self.set_mut(&select.table)?;
        let table = set.table.clone();
        let mut pool = table.pool().write()?;
        for page_id in pages {
            if !set.pages.contains_key(&page_id) {
                if let Some(copy) = pool.copy_page(page_id)? {
                    set.pages.insert(page_id, copy);
                }
            }
        }
        Ok(result)
    }

    /// Runs a batch of `;`-separated insert, update and delete statements.
    ///
    /// The whole batch is parsed and checked before anything is applied: an unknown table,
    /// column or function, or a value of the wrong type, fails the batch with nothing changed.
    /// The accepted batch is appended to the write-ahead log and then applied in order.
    pub fn update(&mut self, sql: &str) -> Result<()> {
        self.check_state(&[TransactionState::Active])?;
        if !check_parentheses(sql) {
            return errinput!("unbalanced parentheses in {:?}", sql.trim());
        }
        let bound = split_statements(sql)
            .into_iter()
            .map(|statement| self.bind(statement))
            .collect::<Result<Vec<_>>>()?;
        if bound.is_empty() {
            return Ok(());
        }

        self.db.wal().append(sql.trim())?;
        self.is_update = true;
        for statement in bound {
            self.apply(statement)?;
        }
        Ok(())
    }

    fn bind(&self, sql: &str) -> Result<Bound> {
        let mutation = Mutation::parse(sql)?;
        let set = self.set(mutation.table())?;
        let schema = set.table.schema()?;
        let typed = |column: &str, literal: &str| -> Result<Cell> {
            let field_type = schema.column(column)?.field_type();
            Ok(Cell::from_field(&parse_literal(literal, field_type)?))
        };

        match mutation {
            Mutation::Insert {
                table,
                columns,
                values,
            } => {
                let columns = columns.unwrap_or_else(|| schema.names());
                if columns.len() != values.len() {
                    return errinput!(
                        "{} has {} columns but {} values were given",
                        table,
                        columns.len(),
                        values.len()
                    );
                }
                let mut given = BTreeMap::new();
                for (column, value) in columns.iter().zip(&values) {
                    if given.insert(column.as_str(), typed(column, value)?).is_some() {
                        return errinput!("column {column} given twice");
                    }
                }
                let mut row = Tuple::new();
                for column in schema.columns() {
                    let cell = match given.remove(column.name()) {
                        Some(cell) => cell,
                        None => Cell::new(column.field_type(), column.default_bytes().clone()),
                    };
                    row.set(column.name(), cell);
                }
                Ok(Bound::Insert { table, row })
            }
            Mutation::Update {
                table,
                assignments,
                conditions,
            } => {
                let assignments = assignments
                    .iter()
                    .map(|(column, value)| Ok((column.clone(), typed(column, value)?)))
                    .collect::<Result<Vec<_>>>()?;
                let select = Select::matching(&table, conditions);
                plan_select(&select, set, &schema, self.db.functions())?;
                Ok(Bound::Update {
                    select,
                    assignments,
                })
            }
            Mutation::Delete { table, conditions } => {
                let select = Select::matching(&table, conditions);
                plan_select(&select, set, &schema, self.db.functions())?;
                Ok(Bound::Delete { select })
            }
        }
    }

    fn apply(&mut self, statement: Bound) -> Result<()> {
        match statement {
            Bound::Insert { table, row } => {
                let slot_id = self.set_mut(&table)?.pending()?.push(row);
                debug!(table = %table, slot_id, "buffered insert");
            }
            Bound::Update {
                select,
                assignments,
            } => {
                let rows = self.run_select(&select)?.into_rows();
                let set = self.set_mut(&select.table)?;
                let table = set.table.clone();
                let mut pool = table.pool().write()?;
                for mut row in rows {
                    let rid = row.record_id();
                    for (column, cell) in &assignments {
                        row.set(column.clone(), cell.clone());
                    }
                    set.shadow(&mut pool, rid.page_id())?.put(rid.slot_id(), row);
                }
            }
            Bound::Delete { select } => {
                let rows = self.run_select(&select)?.into_rows();
                let set = self.set_mut(&select.table)?;
                let table = set.table.clone();
                let mut pool = table.pool().write()?;
                for row in rows {
                    let rid = row.record_id();
                    set.shadow(&mut pool, rid.page_id())?.delete(rid.slot_id());
                }
            }
        }
        Ok(())
    }

    /// Makes the transaction's changes live, table by table in name order.
    ///
    /// A read-only transaction commits trivially. If merging fails the changes already made
    /// stay in place and the transaction becomes [`TransactionState::Failed`]; the caller must
    /// roll back.
    pub fn commit(&mut self) -> Result<()> {
        self.check_state(&[TransactionState::Active])?;
        if self.is_update {
            for set in self.sets.values_mut() {
                if let Err(err) = set.merge() {
                    self.state = TransactionState::Failed;
                    return Err(err);
                }
            }
        }
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Abandons the transaction. After a failed commit this also reverts the tables the commit
    /// had already merged.
    pub fn rollback(&mut self) -> Result<()> {
        self.check_state(&[TransactionState::Active, TransactionState::Failed])?;
        if self.state == TransactionState::Failed {
            warn!(database = self.db.name(), "rolling back a failed commit");
            for set in self.sets.values_mut() {
                set.undo()?;
            }
        }
        self.state = TransactionState::RolledBack;
        Ok(())
    }
}

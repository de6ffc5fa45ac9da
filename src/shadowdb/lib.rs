//! Shadowdb: a single-node relational storage and query engine.
//!
//! Tables are stored page by page behind a per-table LRU buffer pool, on plain files or
//! memory maps. Transactions work on private shadow copies of pages and swap them into the
//! live tables on commit. Select statements run as a pipeline of operators on their own
//! threads.
//!
//! ```no_run
//! use shadowdb::{Column, Instance, Options, Type};
//!
//! let instance = Instance::new(Options::new("/tmp/shadowdb"))?;
//! let db = instance.create_database("shop")?;
//! db.create_table(
//!     "items",
//!     vec![
//!         Column::new("name".to_string(), Type::Varchar),
//!         Column::new("price".to_string(), Type::Float),
//!     ],
//! )?;
//! db.update(r#"insert into items values ("pen", 1.5)"#)?;
//! println!("{}", db.query("select count(name) from items")?);
//! instance.close()?;
//! # Ok::<(), shadowdb::Error>(())
//! ```
pub use shadowdb_catalog as catalog;
pub use shadowdb_engine as engine;
pub use shadowdb_error as error;
pub use shadowdb_execution as execution;
pub use shadowdb_storage as storage;

pub use shadowdb_catalog::column::Column;
pub use shadowdb_catalog::field::Field;
pub use shadowdb_catalog::types::Type;
pub use shadowdb_engine::database::Database;
pub use shadowdb_engine::instance::Instance;
pub use shadowdb_engine::options::Options;
pub use shadowdb_engine::transaction::{Transaction, TransactionState};
pub use shadowdb_error::{Error, Result};
pub use shadowdb_execution::registry::FunctionRegistry;
pub use shadowdb_execution::result::ResultSet;
pub use shadowdb_storage::disk::IoMode;

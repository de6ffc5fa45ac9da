//! Databases, transactions and the statement compiler.
//!
//! An [`instance::Instance`] owns a root directory of databases. A
//! [`database::Database`] holds tables and runs statements in
//! [`transaction::Transaction`]s, which compile them through [`sql`] and the planner into
//! query pipelines.
pub mod database;
pub mod instance;
pub mod options;
pub(crate) mod planner;
pub mod sql;
#[cfg(test)]
pub(crate) mod test_util;
pub mod transaction;
pub mod wal;

pub(crate) type Result<T> = std::result::Result<T, shadowdb_error::Error>;

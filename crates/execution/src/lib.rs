//! Relational operators and the pipeline that runs them.
//!
//! A query compiles into a [`pipeline::QueryPlan`]: one operator per clause, chained in a fixed
//! order by bounded channels, each running on its own thread. Operators call user functions
//! through a [`registry::FunctionRegistry`].
pub mod aggregate;
pub mod derive;
pub mod distinct;
pub mod filter;
pub mod limit;
pub mod operator;
pub mod pipeline;
pub mod project;
pub mod registry;
pub mod rename;
pub mod result;
pub mod scan;
pub mod sort;
#[cfg(test)]
pub(crate) mod test_util;

pub(crate) type Result<T> = std::result::Result<T, shadowdb_error::Error>;

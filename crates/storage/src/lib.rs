//! Durable page storage for a table: storage backends, pages and shadow pages, the LRU buffer
//! pool and the table handle that ties them together.
pub mod buffer_pool;
pub mod disk;
pub mod page;
pub(crate) mod replacer;
pub mod table;
#[cfg(test)]
pub(crate) mod test_util;

pub(crate) type Result<T> = std::result::Result<T, shadowdb_error::Error>;

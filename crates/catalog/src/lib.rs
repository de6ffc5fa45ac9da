//! Column, schema and tuple definitions shared by the storage and execution layers.
//!
//! Also provides the codec (via [`crate::serde`]) between decoded values and their on-disk
//! bytes, and the page catalog / table metadata records persisted alongside each table.
pub mod catalog;
pub mod column;
pub mod field;
pub mod record_id;
pub mod schema;
pub mod serde;
pub mod tuple;
pub mod types;

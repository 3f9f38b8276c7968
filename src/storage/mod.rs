//! Versioned schema migration over SQLite.

pub mod schema;

pub use schema::{ColumnType, SchemaBuilder};

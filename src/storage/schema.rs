//! Additive, versioned DDL migrations.
//!
//! Each schema version registers a list of statements. Opening a database
//! reads `PRAGMA user_version` and replays every statement registered for
//! versions above it, in one transaction. A fresh database replays everything
//! from version 1; an up-to-date one replays nothing.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::Connection;

use crate::error::Error;

/// SQLite column types used by the migration builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER NOT NULL DEFAULT 0",
            ColumnType::Real => "REAL NOT NULL DEFAULT 0",
            ColumnType::Text => "TEXT",
        }
    }
}

/// Row identifier column created by [`SchemaBuilder::create_table`].
pub const COLUMN_ID: &str = "_id";

/// Builder for a versioned table schema.
///
/// ```rust
/// use cookievault::storage::{ColumnType, SchemaBuilder};
///
/// let conn = SchemaBuilder::new()
///     .version(1)
///     .create_table("entry")
///     .add_column("entry", "NAME", ColumnType::Text)
///     .open_in_memory()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    version: i32,
    statements: BTreeMap<i32, Vec<String>>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the schema version. Statements registered after this call belong
    /// to the new version.
    ///
    /// # Panics
    ///
    /// Panics if `version` is not greater than the current version.
    pub fn version(mut self, version: i32) -> Self {
        assert!(
            version > self.version,
            "new version must be greater than current version: current {}, new {}",
            self.version,
            version
        );
        self.version = version;
        self.statements.insert(version, Vec::new());
        self
    }

    /// Creates a table with an `_id` integer primary key.
    pub fn create_table(self, table: &str) -> Self {
        self.statement(format!(
            "CREATE TABLE {table} ({COLUMN_ID} INTEGER PRIMARY KEY);"
        ))
    }

    /// Drops a table.
    pub fn drop_table(self, table: &str) -> Self {
        self.statement(format!("DROP TABLE {table};"))
    }

    /// Adds a column to a table.
    pub fn add_column(self, table: &str, column: &str, kind: ColumnType) -> Self {
        self.statement(format!(
            "ALTER TABLE {table} ADD COLUMN {column} {};",
            kind.sql()
        ))
    }

    /// Registers a raw migration statement for the current version.
    ///
    /// # Panics
    ///
    /// Panics if called before [`version`](Self::version).
    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        let version = self.version;
        assert!(version > 0, "call version() first");
        self.statements
            .get_mut(&version)
            .expect("statement list for current version")
            .push(statement.into());
        self
    }

    /// All statements registered for versions in `(old, new]`, in order.
    fn statements_between(&self, old: i32, new: i32) -> Vec<&str> {
        self.statements
            .range(old + 1..=new)
            .flat_map(|(_, list)| list.iter().map(String::as_str))
            .collect()
    }

    /// Opens a database file and migrates it to the builder's version.
    pub fn open(self, path: impl AsRef<Path>) -> Result<Connection, Error> {
        let mut conn = Connection::open(path)?;
        self.migrate(&mut conn)?;
        Ok(conn)
    }

    /// Opens a fresh in-memory database at the builder's version.
    pub fn open_in_memory(self) -> Result<Connection, Error> {
        let mut conn = Connection::open_in_memory()?;
        self.migrate(&mut conn)?;
        Ok(conn)
    }

    fn migrate(&self, conn: &mut Connection) -> Result<(), Error> {
        let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current == self.version {
            return Ok(());
        }
        if current > self.version {
            return Err(Error::SchemaDowngrade {
                from: current,
                to: self.version,
            });
        }

        let tx = conn.transaction()?;
        for statement in self.statements_between(current, self.version) {
            tx.execute_batch(statement)?;
        }
        tx.execute_batch(&format!("PRAGMA user_version = {};", self.version))?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
            .version(1)
            .create_table("entry")
            .add_column("entry", "NAME", ColumnType::Text)
            .version(2)
            .add_column("entry", "SCORE", ColumnType::Integer)
    }

    #[test]
    fn statements_between_replays_half_open_range() {
        let schema = builder();
        assert_eq!(schema.statements_between(0, 2).len(), 3);
        assert_eq!(schema.statements_between(1, 2).len(), 1);
        assert_eq!(schema.statements_between(2, 2).len(), 0);
    }

    #[test]
    #[should_panic(expected = "new version must be greater")]
    fn version_must_increase() {
        let _ = SchemaBuilder::new().version(2).version(2);
    }

    #[test]
    #[should_panic(expected = "call version() first")]
    fn statement_requires_version() {
        let _ = SchemaBuilder::new().statement("CREATE TABLE t (a);");
    }

    #[test]
    fn fresh_database_gets_full_schema() {
        let conn = builder().open_in_memory().unwrap();
        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);

        conn.execute("INSERT INTO entry (NAME, SCORE) VALUES ('a', 7)", [])
            .unwrap();
        let score: i64 = conn
            .query_row("SELECT SCORE FROM entry WHERE NAME = 'a'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(score, 7);
    }

    #[test]
    fn upgrade_replays_only_missing_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.db");

        // Open at version 1, insert a row.
        let conn = SchemaBuilder::new()
            .version(1)
            .create_table("entry")
            .add_column("entry", "NAME", ColumnType::Text)
            .open(&path)
            .unwrap();
        conn.execute("INSERT INTO entry (NAME) VALUES ('kept')", [])
            .unwrap();
        drop(conn);

        // Reopen at version 2: the row survives, the new column appears.
        let conn = builder().open(&path).unwrap();
        let (name, score): (String, i64) = conn
            .query_row("SELECT NAME, SCORE FROM entry", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "kept");
        assert_eq!(score, 0);
    }

    #[test]
    fn downgrade_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.db");
        drop(builder().open(&path).unwrap());

        let result = SchemaBuilder::new()
            .version(1)
            .create_table("entry")
            .open(&path);
        assert!(matches!(result, Err(Error::SchemaDowngrade { from: 2, to: 1 })));
    }
}

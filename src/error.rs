use thiserror::Error;

/// Errors surfaced by fallible operations.
///
/// Only store construction, schema migration and the JSON snapshot codec
/// return these. The cookie-jar operations themselves absorb storage-layer
/// failures and log them instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cannot downgrade schema from version {from} to version {to}")]
    SchemaDowngrade { from: i32, to: i32 },

    #[error("malformed cookie snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

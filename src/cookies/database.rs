//! Durable cookie rows and the cookie-to-row identity map.
//!
//! The database is write-through: the in-memory jar is authoritative and a
//! failed row operation is logged, never raised. Only persistent cookies
//! reach this layer.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rusqlite::{params, Connection, Row};

use crate::cookies::cookie::Cookie;
use crate::cookies::set::CookieSet;
use crate::error::Error;
use crate::settings::SettingsProvider;
use crate::storage::{ColumnType, SchemaBuilder};

const VERSION_1: i32 = 1;
const DB_VERSION: i32 = VERSION_1;

const TABLE_COOKIE: &str = "COOKIE";
const COLUMN_NAME: &str = "NAME";
const COLUMN_VALUE: &str = "VALUE";
const COLUMN_EXPIRES_AT: &str = "EXPIRES_AT";
const COLUMN_DOMAIN: &str = "DOMAIN";
const COLUMN_PATH: &str = "PATH";
const COLUMN_SECURE: &str = "SECURE";
const COLUMN_HTTP_ONLY: &str = "HTTP_ONLY";
const COLUMN_PERSISTENT: &str = "PERSISTENT";
const COLUMN_HOST_ONLY: &str = "HOST_ONLY";

/// Cookie whose durable row can be frozen through
/// [`SettingsProvider::lock_cookie_igneous`].
const LOCKED_COOKIE_NAME: &str = "igneous";

/// SQLite-backed cookie store.
///
/// Keeps a map from cookie (full-field identity) to rowid so that updates and
/// removals hit the right row without a query.
pub struct CookieDatabase {
    conn: Connection,
    settings: Arc<dyn SettingsProvider>,
    id_map: HashMap<Cookie, i64>,
}

fn schema() -> SchemaBuilder {
    SchemaBuilder::new()
        .version(VERSION_1)
        .create_table(TABLE_COOKIE)
        .add_column(TABLE_COOKIE, COLUMN_NAME, ColumnType::Text)
        .add_column(TABLE_COOKIE, COLUMN_VALUE, ColumnType::Text)
        .add_column(TABLE_COOKIE, COLUMN_EXPIRES_AT, ColumnType::Integer)
        .add_column(TABLE_COOKIE, COLUMN_DOMAIN, ColumnType::Text)
        .add_column(TABLE_COOKIE, COLUMN_PATH, ColumnType::Text)
        .add_column(TABLE_COOKIE, COLUMN_SECURE, ColumnType::Integer)
        .add_column(TABLE_COOKIE, COLUMN_HTTP_ONLY, ColumnType::Integer)
        .add_column(TABLE_COOKIE, COLUMN_PERSISTENT, ColumnType::Integer)
        .add_column(TABLE_COOKIE, COLUMN_HOST_ONLY, ColumnType::Integer)
}

/// Decode a row scanned at `now`. `None` marks the row for deletion:
/// missing required fields, non-persistent, or already expired.
fn decode_cookie(row: &Row<'_>, now: i64) -> Option<Cookie> {
    let name: Option<String> = row.get(1).ok().flatten();
    let value: Option<String> = row.get(2).ok().flatten();
    let expires_at: i64 = row.get(3).unwrap_or(0);
    let domain: Option<String> = row.get(4).ok().flatten();
    let path: Option<String> = row.get(5).ok().flatten();
    let secure: bool = row.get(6).unwrap_or(false);
    let http_only: bool = row.get(7).unwrap_or(false);
    let persistent: bool = row.get(8).unwrap_or(false);
    let host_only: bool = row.get(9).unwrap_or(false);

    let (name, domain, path) = (name?, domain?, path?);

    if !persistent || expires_at <= now {
        return None;
    }

    let mut builder = Cookie::builder()
        .name(name)
        .value(value.unwrap_or_default())
        .path(path)
        .expires_at(expires_at);
    builder = if host_only {
        builder.host_only_domain(&domain)
    } else {
        builder.domain(&domain)
    };
    if secure {
        builder = builder.secure();
    }
    if http_only {
        builder = builder.http_only();
    }
    Some(builder.build())
}

impl CookieDatabase {
    /// Opens (and migrates) the database file.
    pub fn open(path: impl AsRef<Path>, settings: Arc<dyn SettingsProvider>) -> Result<Self, Error> {
        Ok(Self {
            conn: schema().open(path)?,
            settings,
            id_map: HashMap::new(),
        })
    }

    /// In-memory store; nothing survives drop. Useful for tests and
    /// incognito-style jars.
    pub fn open_in_memory(settings: Arc<dyn SettingsProvider>) -> Result<Self, Error> {
        Ok(Self {
            conn: schema().open_in_memory()?,
            settings,
            id_map: HashMap::new(),
        })
    }

    /// Scans every row, grouping valid cookies per domain and registering
    /// them in the identity map. Invalid and expired rows are deleted in one
    /// batch transaction after the scan.
    pub fn load_all(&mut self) -> Result<HashMap<String, CookieSet>, Error> {
        let now = crate::cookies::cookie::now_millis();
        let mut map: HashMap<String, CookieSet> = HashMap::new();
        let mut to_remove: Vec<i64> = Vec::new();

        {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT _id, {COLUMN_NAME}, {COLUMN_VALUE}, {COLUMN_EXPIRES_AT}, {COLUMN_DOMAIN}, \
                 {COLUMN_PATH}, {COLUMN_SECURE}, {COLUMN_HTTP_ONLY}, {COLUMN_PERSISTENT}, \
                 {COLUMN_HOST_ONLY} FROM {TABLE_COOKIE}"
            ))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let id: i64 = row.get(0)?;
                match decode_cookie(row, now) {
                    Some(cookie) => {
                        self.id_map.insert(cookie.clone(), id);
                        map.entry(cookie.domain.clone())
                            .or_insert_with(CookieSet::new)
                            .add(cookie);
                    }
                    None => to_remove.push(id),
                }
            }
        }

        if !to_remove.is_empty() {
            tracing::debug!(count = to_remove.len(), "purging invalid or expired cookie rows");
            let tx = self.conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare(&format!("DELETE FROM {TABLE_COOKIE} WHERE _id = ?1"))?;
                for id in &to_remove {
                    stmt.execute([id])?;
                }
            }
            tx.commit()?;
        }

        Ok(map)
    }

    /// Inserts a new row for `cookie` and records its rowid.
    pub fn add(&mut self, cookie: &Cookie) {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO {TABLE_COOKIE} ({COLUMN_NAME}, {COLUMN_VALUE}, {COLUMN_EXPIRES_AT}, \
                 {COLUMN_DOMAIN}, {COLUMN_PATH}, {COLUMN_SECURE}, {COLUMN_HTTP_ONLY}, \
                 {COLUMN_PERSISTENT}, {COLUMN_HOST_ONLY}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                cookie.name,
                cookie.value,
                cookie.expires_at,
                cookie.domain,
                cookie.path,
                cookie.secure,
                cookie.http_only,
                cookie.persistent,
                cookie.host_only,
            ],
        );
        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                if self.id_map.insert(cookie.clone(), id).is_some() {
                    tracing::error!(name = %cookie.name, "added a duplicate cookie");
                }
            }
            Err(err) => {
                tracing::error!(name = %cookie.name, error = %err, "failed to insert cookie");
            }
        }
    }

    /// Rewrites `from`'s row with `to`'s fields. Must affect exactly one row.
    pub fn update(&mut self, from: &Cookie, to: &Cookie) {
        let Some(&id) = self.id_map.get(from) else {
            tracing::error!(name = %from.name, "no row id for cookie update");
            return;
        };

        if from.name == LOCKED_COOKIE_NAME && self.settings.lock_cookie_igneous() {
            tracing::debug!(name = %from.name, "cookie update locked by settings");
            return;
        }

        let result = self.conn.execute(
            &format!(
                "UPDATE {TABLE_COOKIE} SET {COLUMN_NAME} = ?1, {COLUMN_VALUE} = ?2, \
                 {COLUMN_EXPIRES_AT} = ?3, {COLUMN_DOMAIN} = ?4, {COLUMN_PATH} = ?5, \
                 {COLUMN_SECURE} = ?6, {COLUMN_HTTP_ONLY} = ?7, {COLUMN_PERSISTENT} = ?8, \
                 {COLUMN_HOST_ONLY} = ?9 WHERE _id = ?10"
            ),
            params![
                to.name,
                to.value,
                to.expires_at,
                to.domain,
                to.path,
                to.secure,
                to.http_only,
                to.persistent,
                to.host_only,
                id,
            ],
        );
        match result {
            Ok(1) => {}
            Ok(count) => {
                tracing::error!(name = %from.name, count, "bad row count when updating cookie");
            }
            Err(err) => {
                tracing::error!(name = %from.name, error = %err, "failed to update cookie");
            }
        }

        self.id_map.remove(from);
        self.id_map.insert(to.clone(), id);
    }

    /// Deletes `cookie`'s row. Must affect exactly one row.
    pub fn remove(&mut self, cookie: &Cookie) {
        let Some(&id) = self.id_map.get(cookie) else {
            tracing::error!(name = %cookie.name, "no row id for cookie removal");
            return;
        };

        let result = self.conn.execute(
            &format!("DELETE FROM {TABLE_COOKIE} WHERE _id = ?1"),
            params![id],
        );
        match result {
            Ok(1) => {}
            Ok(count) => {
                tracing::error!(name = %cookie.name, count, "bad row count when removing cookie");
            }
            Err(err) => {
                tracing::error!(name = %cookie.name, error = %err, "failed to remove cookie");
            }
        }

        self.id_map.remove(cookie);
    }

    /// Deletes every row and forgets every identity.
    pub fn clear(&mut self) {
        if let Err(err) = self.conn.execute(&format!("DELETE FROM {TABLE_COOKIE}"), []) {
            tracing::error!(error = %err, "failed to clear cookie table");
        }
        self.id_map.clear();
    }

    #[cfg(test)]
    fn row_count(&self) -> i64 {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE_COOKIE}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }
}

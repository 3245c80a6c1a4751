//! Persistence gateway.
//!
//! Repositories are free functions over a `&Connection` grouped per entity.
//! They run either on the shared connection (`SqliteStore::read`) or inside a
//! transaction (`SqliteStore::write`), since `Transaction` derefs to
//! `Connection`. Never call `read` from inside a `write` closure: the shared
//! connection is behind a mutex.

pub mod agents;
mod context;
pub mod drafts;
pub mod namespaces;
pub mod pages;
pub mod permissions;
pub mod projects;
pub mod query;
pub mod redirects;
pub mod roles;
mod schema;
pub mod tokens;
pub mod users;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::config::DbConfig;
use crate::error::{Error, Result};

pub use context::Ctx;
pub use query::{Condition, Direction, Paginated, Pagination, Select, SortParam};
pub use schema::SCHEMA;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
}

/// Dialects this build can open, keyed by `db.driver`.
pub const DIALECTS: &[(&str, Dialect)] = &[("sqlite", Dialect::Sqlite), ("sqlite3", Dialect::Sqlite)];

impl Dialect {
    pub fn lookup(table: &[(&str, Dialect)], driver: &str) -> Result<Dialect> {
        table
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(driver))
            .map(|(_, dialect)| *dialect)
            .ok_or_else(|| Error::Config(format!("unsupported database driver '{driver}'")))
    }
}

pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens the store described by `config` using the built-in dialect table.
    pub fn open(config: &DbConfig) -> Result<Self> {
        Self::open_with(config, DIALECTS)
    }

    pub fn open_with(config: &DbConfig, dialects: &[(&str, Dialect)]) -> Result<Self> {
        match Dialect::lookup(dialects, &config.driver)? {
            Dialect::Sqlite => {
                if let Some(parent) = config.path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Self::with_busy_timeout(&config.path, config.busy_timeout())
            }
        }
    }

    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Every connection waits up to `busy_timeout` for the database write
    /// lock before failing with a lock-conflict storage error.
    pub fn with_busy_timeout<P: AsRef<Path>>(db_path: P, busy_timeout: Duration) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(busy_timeout)?;

        Ok(Self {
            path,
            busy_timeout,
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the shared connection, for ad-hoc SQL.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Runs `f` on the shared connection without a transaction.
    pub fn read<T, F>(&self, ctx: &Ctx, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        ctx.check()?;
        let conn = self.conn();
        f(&conn)
    }

    /// Runs `f` inside one transaction on the shared connection.
    ///
    /// The write lock is taken up front and waits up to the busy timeout.
    /// Any error, or a cancellation observed after `f` returns, rolls back.
    pub fn write<T, F>(&self, ctx: &Ctx, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        ctx.check()?;
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        ctx.check()?;
        tx.commit()?;
        Ok(value)
    }
}

/// Current instant at the precision timestamps are stored with.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC3339 so that string order equals time order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

pub(crate) fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.filter(|s| !s.is_empty()).map(|s| parse_datetime(&s))
}

/// Reads a text column into one of the string-backed enums.
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use super::*;

    /// A fresh initialized store; keep the `TempDir` alive for the test.
    pub fn store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    pub fn seed_project(store: &SqliteStore, ns: &str, code: &str) {
        let ctx = Ctx::new();
        store
            .write(&ctx, |tx| {
                if namespaces::get(tx, ns)?.is_none() {
                    namespaces::insert(tx, ns, ns)?;
                }
                projects::insert(tx, ns, code, code)?;
                Ok(())
            })
            .unwrap();
    }
}

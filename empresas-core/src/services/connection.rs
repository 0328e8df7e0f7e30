// src/services/connection.rs
//! Connection provider.
//!
//! - Opens one short-lived SQLite connection per logical operation and drops it
//!   when the operation ends (no pooling, no shared handle).
//! - `with_tx` commits only when the closure succeeds; an early return or error
//!   rolls the transaction back on drop.
//! - Storage failures are logged here, with the operation name, before they are
//!   handed back to the caller.

use rusqlite::{Connection, ErrorCode, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(5_000),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection. Creates the parent directory if missing.
    pub fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Run read-only work on a scoped connection.
    pub fn with_conn<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let result = self.connect().and_then(|conn| f(&conn));
        self.log_failure(op, &result);
        result
    }

    /// Run work inside a transaction on a scoped connection.
    pub fn with_tx<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let result = (|| -> Result<T> {
            let mut conn = self.connect()?;
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })();
        self.log_failure(op, &result);
        result
    }

    fn log_failure<T>(&self, op: &'static str, result: &Result<T>) {
        if let Err(e) = result {
            if e.is_storage() {
                tracing::error!(op, db = %self.path.display(), error = %e, "store operation failed");
            } else {
                tracing::debug!(op, error = %e, "store operation rejected");
            }
        }
    }
}

/// Extended result code of a constraint violation, if `e` is one.
pub(crate) fn constraint_code(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            Some(err.extended_code)
        }
        _ => None,
    }
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    constraint_code(e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

pub(crate) fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
    constraint_code(e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

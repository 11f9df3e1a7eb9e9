//! SQLite driver backed by the synchronous [`rusqlite`] crate.
//!
//! Rows are `Vec<rusqlite::types::Value>`, exactly as rusqlite reads them.
//! A statement's rows are read into the cursor when it executes, since a
//! rusqlite statement cannot outlive the borrow of its connection.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{OpenFlags, ffi};

use super::shared::{Disconnect, SharedConnection};
use crate::driver::{Connect, DriverConnection, DriverCursor};

impl Disconnect for rusqlite::Connection {
    type Error = rusqlite::Error;

    fn disconnect(self) -> rusqlite::Result<()> {
        self.close().map_err(|(_, e)| e)
    }
}

/// Error SQLite itself reports for use of a closed handle.
fn closed_error() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        ffi::Error::new(ffi::SQLITE_MISUSE),
        Some("connection is closed".to_string()),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Memory,
    Path(PathBuf),
}

/// Connection parameters handed to rusqlite as given.
#[derive(Clone)]
pub struct SqliteConfig {
    target: Target,
    flags: OpenFlags,
    busy_timeout: Option<Duration>,
}

impl SqliteConfig {
    /// A private in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            target: Target::Memory,
            flags: OpenFlags::default(),
            busy_timeout: None,
        }
    }

    /// A database file.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::Path(path.into()),
            flags: OpenFlags::default(),
            busy_timeout: None,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub const fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub const fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout
    }
}

impl fmt::Debug for SqliteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConfig")
            .field("target", &self.target)
            .field("flags", &self.flags.bits())
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

impl Connect for SqliteConfig {
    type Connection = SqliteConnection;
    type Error = rusqlite::Error;

    fn connect(self) -> rusqlite::Result<SqliteConnection> {
        let conn = match self.target {
            Target::Memory => rusqlite::Connection::open_in_memory_with_flags(self.flags)?,
            Target::Path(path) => rusqlite::Connection::open_with_flags(path, self.flags)?,
        };
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }

        Ok(SqliteConnection {
            inner: SharedConnection::new(conn),
        })
    }
}

/// Open SQLite connection.
#[derive(Debug)]
pub struct SqliteConnection {
    inner: Arc<SharedConnection<rusqlite::Connection>>,
}

impl DriverConnection for SqliteConnection {
    type Cursor = SqliteCursor;
    type Error = rusqlite::Error;

    fn cursor(&mut self) -> rusqlite::Result<SqliteCursor> {
        if self.inner.is_closed() {
            return Err(closed_error());
        }
        Ok(SqliteCursor {
            connection: Arc::clone(&self.inner),
            rows: VecDeque::new(),
        })
    }

    fn close(&mut self) -> rusqlite::Result<()> {
        self.inner.close()
    }
}

/// Cursor over a [`SqliteConnection`].
#[derive(Debug)]
pub struct SqliteCursor {
    connection: Arc<SharedConnection<rusqlite::Connection>>,
    rows: VecDeque<Vec<Value>>,
}

impl SqliteCursor {
    fn ensure_connected(&self) -> rusqlite::Result<()> {
        if self.connection.is_closed() {
            Err(closed_error())
        } else {
            Ok(())
        }
    }
}

impl DriverCursor for SqliteCursor {
    type Param = Value;
    type Row = Vec<Value>;
    type Error = rusqlite::Error;

    fn execute(&mut self, statement: &str, params: &[Value]) -> rusqlite::Result<()> {
        self.rows.clear();

        let rows = self.connection.with_connection(closed_error, |conn| {
            let mut stmt = conn.prepare(statement)?;
            let columns = stmt.column_count();
            let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
            let mut buffered = VecDeque::new();
            while let Some(row) = rows.next()? {
                let values = (0..columns)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                buffered.push_back(values);
            }
            Ok(buffered)
        })?;

        self.rows = rows;
        Ok(())
    }

    fn fetchone(&mut self) -> rusqlite::Result<Option<Vec<Value>>> {
        self.ensure_connected()?;
        Ok(self.rows.pop_front())
    }

    fn fetchall(&mut self) -> rusqlite::Result<Vec<Vec<Value>>> {
        self.ensure_connected()?;
        Ok(self.rows.drain(..).collect())
    }

    fn close(&mut self) -> rusqlite::Result<()> {
        self.rows.clear();
        Ok(())
    }
}

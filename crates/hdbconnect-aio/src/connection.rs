//! Connection facade.
//!
//! Owns one driver connection. Closing is idempotent and silent; dropping the
//! facade closes it, so the owning scope guarantees release on every exit path
//! (return, `?`, panic unwind, or a dropped future).

use std::fmt;

use parking_lot::Mutex;

use crate::cursor::Cursor;
use crate::driver::{Connect, DriverConnection};
use crate::error::{Error, Resource, Result};
use crate::executor::Executor;

/// Internal connection state.
enum ConnectionInner<C> {
    /// Active connection.
    Connected(C),
    /// Disconnected state.
    Disconnected,
}

impl<C> ConnectionInner<C> {
    const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// Open a connection on the caller's runtime.
///
/// The driver's connect call runs on the blocking pool. Errors are the
/// driver's own.
///
/// # Example
///
/// ```rust,no_run
/// use hdbconnect_aio::drivers::sqlite::SqliteConfig;
///
/// # async fn demo() -> Result<(), hdbconnect_aio::Error<rusqlite::Error>> {
/// let conn = hdbconnect_aio::connect(SqliteConfig::memory()).await?;
/// let cur = conn.cursor()?;
/// cur.execute("SELECT 1", []).await?;
/// let row = cur.fetchone()?;
/// # Ok(())
/// # }
/// ```
pub async fn connect<P: Connect>(config: P) -> Result<Connection<P::Connection>, P::Error> {
    Connection::connect_with(config, Executor::current()).await
}

/// Asynchronous facade over a driver connection.
///
/// Not meant to be shared between tasks that use it concurrently; the driver
/// decides what happens if it is.
pub struct Connection<C: DriverConnection> {
    inner: Mutex<ConnectionInner<C>>,
    executor: Executor,
}

impl<C: DriverConnection> Connection<C> {
    /// Open a connection, constructing it on the blocking pool.
    pub async fn connect<P>(config: P) -> Result<Self, P::Error>
    where
        P: Connect<Connection = C>,
    {
        Self::connect_with(config, Executor::current()).await
    }

    /// Open a connection on `executor`; cursors created from it inherit it.
    pub async fn connect_with<P>(config: P, executor: Executor) -> Result<Self, P::Error>
    where
        P: Connect<Connection = C>,
    {
        let span = tracing::debug_span!("connect");
        let connection = executor
            .run(move || span.in_scope(|| config.connect()))
            .await?
            .map_err(Error::Driver)?;

        tracing::debug!("connection established");
        Ok(Self::from_driver(connection, executor))
    }

    /// Open a connection inline, blocking the calling thread.
    pub fn connect_blocking<P>(config: P) -> Result<Self, P::Error>
    where
        P: Connect<Connection = C>,
    {
        let connection = config.connect().map_err(Error::Driver)?;
        tracing::debug!("connection established");
        Ok(Self::from_driver(connection, Executor::current()))
    }

    /// Wrap an already open driver connection.
    pub fn from_driver(connection: C, executor: Executor) -> Self {
        Self {
            inner: Mutex::new(ConnectionInner::Connected(connection)),
            executor,
        }
    }

    /// Create a cursor bound to this connection.
    pub fn cursor(&self) -> Result<Cursor<C::Cursor>, C::Error> {
        let mut guard = self.inner.lock();
        match &mut *guard {
            ConnectionInner::Connected(connection) => {
                let cursor = connection.cursor().map_err(Error::Driver)?;
                drop(guard);
                tracing::debug!("cursor created");
                Ok(Cursor::new(cursor, self.executor.clone()))
            }
            ConnectionInner::Disconnected => Err(Error::Closed(Resource::Connection)),
        }
    }

    /// Close the connection.
    ///
    /// Safe to call any number of times. A driver failure while closing is
    /// logged and otherwise ignored.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.inner.lock(), ConnectionInner::Disconnected);
        if let ConnectionInner::Connected(mut connection) = previous {
            match connection.close() {
                Ok(()) => tracing::debug!("connection closed"),
                Err(e) => tracing::warn!(error = %e, "driver failed to close connection"),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.inner.lock().is_connected()
    }

    pub const fn executor(&self) -> &Executor {
        &self.executor
    }
}

impl<C: DriverConnection> Drop for Connection<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: DriverConnection> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .field("executor", &self.executor)
            .finish()
    }
}

impl<C: DriverConnection> fmt::Display for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_closed() {
            "closed"
        } else {
            "connected"
        };
        write!(f, "Connection(state={state})")
    }
}

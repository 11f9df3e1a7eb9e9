//! Connection handle shared between a driver connection and its cursors.
//!
//! A cursor's `execute` holds the handle on a blocking worker for the whole
//! statement. `close` therefore never waits for the lock: when the handle is
//! busy it only marks the connection closed, and whichever call holds the
//! lock disconnects on its way out.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// A driver connection that can be shut down explicitly.
pub trait Disconnect: Send + 'static {
    type Error: fmt::Display;

    fn disconnect(self) -> Result<(), Self::Error>;
}

/// Internal connection state.
#[derive(Debug)]
pub enum ConnectionInner<T> {
    /// Active connection.
    Connected(T),
    /// Disconnected state.
    Disconnected,
}

/// Connection reachable from every cursor it created.
pub struct SharedConnection<T> {
    inner: Mutex<ConnectionInner<T>>,
    closed: AtomicBool,
}

impl<T: Disconnect> SharedConnection<T> {
    pub fn new(connection: T) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ConnectionInner::Connected(connection)),
            closed: AtomicBool::new(false),
        })
    }

    #[cfg(test)]
    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ConnectionInner::Disconnected),
            closed: AtomicBool::new(true),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run `f` on the open connection, or fail with `closed()`.
    ///
    /// Completes a close requested while `f` was running.
    pub fn with_connection<R, E>(
        &self,
        closed: impl FnOnce() -> E,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E> {
        let result = match &mut *self.inner.lock() {
            ConnectionInner::Connected(conn) if !self.is_closed() => f(conn),
            _ => Err(closed()),
        };
        if self.is_closed() {
            self.finish_close();
        }
        result
    }

    /// Mark the connection closed and disconnect it if nobody holds it.
    ///
    /// Idempotent. A deferred disconnect reports failures through `tracing`.
    pub fn close(&self) -> Result<(), T::Error> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(mut guard) = self.inner.try_lock() else {
            tracing::debug!("connection busy, disconnect deferred to the running call");
            return Ok(());
        };
        let previous = std::mem::replace(&mut *guard, ConnectionInner::Disconnected);
        drop(guard);
        match previous {
            ConnectionInner::Connected(conn) => conn.disconnect(),
            ConnectionInner::Disconnected => Ok(()),
        }
    }

    fn finish_close(&self) {
        let previous = std::mem::replace(&mut *self.inner.lock(), ConnectionInner::Disconnected);
        if let ConnectionInner::Connected(conn) = previous {
            match conn.disconnect() {
                Ok(()) => tracing::debug!("deferred disconnect completed"),
                Err(e) => tracing::warn!(error = %e, "deferred disconnect failed"),
            }
        }
    }
}

impl<T> fmt::Debug for SharedConnection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedConnection")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

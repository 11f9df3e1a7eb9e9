//! Cursor facade.
//!
//! `execute` is the only asynchronous operation: the driver call runs on the
//! blocking pool while the calling task is suspended. Fetching and closing are
//! synchronous passthroughs on the calling thread.
//!
//! Cancelling an `execute` future does not stop the driver call. Until it
//! returns, `fetchone` and `fetchall` on the same cursor wait for it. `close`
//! and drop do not: they mark the cursor closed and the worker releases the
//! driver cursor once its call returns.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::driver::DriverCursor;
use crate::error::{Error, Resource, Result};
use crate::executor::Executor;

/// Internal cursor state.
enum CursorInner<C> {
    /// Open driver cursor.
    Open(C),
    /// Closed; the driver cursor has been released.
    Closed,
}

/// Cursor state shared with the worker running `execute`.
struct SharedCursor<C> {
    inner: Mutex<CursorInner<C>>,
    closed: AtomicBool,
}

impl<C: DriverCursor> SharedCursor<C> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run `f` on the open driver cursor, then finish any close requested
    /// while it ran.
    fn with_cursor<T>(
        &self,
        f: impl FnOnce(&mut C) -> std::result::Result<T, C::Error>,
    ) -> Result<T, C::Error> {
        let result = match &mut *self.inner.lock() {
            CursorInner::Open(cursor) if !self.is_closed() => f(cursor).map_err(Error::Driver),
            _ => Err(Error::Closed(Resource::Cursor)),
        };
        if self.is_closed() {
            let previous = std::mem::replace(&mut *self.inner.lock(), CursorInner::Closed);
            release(previous);
        }
        result
    }

    /// Mark closed; release the driver cursor now unless a call holds it.
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(mut guard) = self.inner.try_lock() else {
            tracing::debug!("cursor busy, close deferred to the running execute");
            return;
        };
        let previous = std::mem::replace(&mut *guard, CursorInner::Closed);
        drop(guard);
        release(previous);
    }
}

fn release<C: DriverCursor>(previous: CursorInner<C>) {
    if let CursorInner::Open(mut cursor) = previous {
        match cursor.close() {
            Ok(()) => tracing::debug!("cursor closed"),
            Err(e) => tracing::warn!(error = %e, "driver failed to close cursor"),
        }
    }
}

/// Asynchronous facade over a driver cursor.
///
/// Created by [`Connection::cursor`](crate::Connection::cursor). Callers must
/// not issue overlapping `execute` calls on one cursor.
pub struct Cursor<C: DriverCursor> {
    shared: Arc<SharedCursor<C>>,
    executor: Executor,
}

impl<C: DriverCursor> Cursor<C> {
    pub(crate) fn new(cursor: C, executor: Executor) -> Self {
        Self {
            shared: Arc::new(SharedCursor {
                inner: Mutex::new(CursorInner::Open(cursor)),
                closed: AtomicBool::new(false),
            }),
            executor,
        }
    }

    /// Execute a statement with positional parameters.
    ///
    /// Results are read afterwards with [`fetchone`](Self::fetchone) or
    /// [`fetchall`](Self::fetchall). Pass `[]` when there are no parameters.
    pub async fn execute<S, I>(&self, statement: S, params: I) -> Result<(), C::Error>
    where
        S: Into<String>,
        I: IntoIterator<Item = C::Param>,
    {
        if self.is_closed() {
            return Err(Error::Closed(Resource::Cursor));
        }
        let statement = statement.into();
        let params: Vec<C::Param> = params.into_iter().collect();
        let shared = Arc::clone(&self.shared);
        let span = tracing::debug_span!("execute", params = params.len());

        let pending = self.executor.spawn(move || {
            span.in_scope(|| {
                tracing::debug!(statement = %statement, "executing");
                let result = shared.with_cursor(|cursor| cursor.execute(&statement, &params));
                tracing::debug!(ok = result.is_ok(), "execute finished");
                result
            })
        })?;

        pending.await?
    }

    /// Fetch the next row, or `None` when no rows remain.
    pub fn fetchone(&self) -> Result<Option<C::Row>, C::Error> {
        if self.is_closed() {
            return Err(Error::Closed(Resource::Cursor));
        }
        self.shared.with_cursor(|cursor| cursor.fetchone())
    }

    /// Fetch all remaining rows.
    pub fn fetchall(&self) -> Result<Vec<C::Row>, C::Error> {
        if self.is_closed() {
            return Err(Error::Closed(Resource::Cursor));
        }
        self.shared.with_cursor(|cursor| cursor.fetchall())
    }

    /// Close the cursor. Idempotent and silent; never waits for a running
    /// `execute`.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<C: DriverCursor> Drop for Cursor<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: DriverCursor> fmt::Debug for Cursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<C: DriverCursor> fmt::Display for Cursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_closed() { "closed" } else { "open" };
        write!(f, "Cursor(state={state})")
    }
}

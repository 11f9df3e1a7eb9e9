//! Async execution adapter.
//!
//! Moves a blocking call onto tokio's blocking thread pool and hands back a
//! [`PendingExecution`] the calling task can await without stalling the
//! scheduler it runs on.
//!
//! # Cancellation
//!
//! Dropping a [`PendingExecution`] detaches the worker: the blocking call keeps
//! running on its thread until it returns, and its value is discarded. Blocking
//! calls cannot be interrupted from the outside.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::ExecutorError;

/// Where blocking calls are dispatched.
///
/// The default dispatches to the blocking pool of whichever runtime the caller
/// is running on. A pinned [`Handle`] lets a current-thread caller borrow the
/// blocking pool of another runtime.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    handle: Option<Handle>,
}

impl Executor {
    /// Dispatch to the runtime the caller runs on.
    #[must_use]
    pub const fn current() -> Self {
        Self { handle: None }
    }

    /// Dispatch to the given runtime.
    #[must_use]
    pub const fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Schedule `f` on a blocking worker.
    ///
    /// The call starts right away; the returned value only observes it.
    pub fn spawn<F, T>(&self, f: F) -> Result<PendingExecution<T>, ExecutorError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let handle = match &self.handle {
            Some(handle) => handle.spawn_blocking(f),
            None => Handle::try_current()
                .map_err(|_| ExecutorError::NoRuntime)?
                .spawn_blocking(f),
        };
        Ok(PendingExecution { handle })
    }

    /// Schedule `f` on a blocking worker and wait for its value.
    pub async fn run<F, T>(&self, f: F) -> Result<T, ExecutorError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(f)?.await
    }
}

/// A blocking call in flight on a worker thread.
///
/// Resolves to the call's return value. A panic inside the call is resumed in
/// the awaiting task with its original payload.
pub struct PendingExecution<T> {
    handle: JoinHandle<T>,
}

impl<T> PendingExecution<T> {
    /// Whether the blocking call has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> fmt::Debug for PendingExecution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingExecution")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

impl<T> Future for PendingExecution<T> {
    type Output = Result<T, ExecutorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(err)) => match err.try_into_panic() {
                Ok(payload) => std::panic::resume_unwind(payload),
                Err(_) => Poll::Ready(Err(ExecutorError::WorkerCancelled)),
            },
        }
    }
}

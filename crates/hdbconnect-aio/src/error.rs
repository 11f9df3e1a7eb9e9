//! Error types for the connection and cursor facades.
//!
//! Driver errors pass through untouched inside [`Error::Driver`]. The other
//! variants cover the conditions the facade itself can observe:
//! - operations on a closed connection or cursor
//! - a blocking call that could not be scheduled or never completed

use std::fmt;

use thiserror::Error;

/// Facade resource kind, used in closed-state errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A [`Connection`](crate::Connection).
    Connection,
    /// A [`Cursor`](crate::Cursor).
    Cursor,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => f.write_str("connection"),
            Self::Cursor => f.write_str("cursor"),
        }
    }
}

/// Failure of the async execution adapter itself.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorError {
    /// No tokio runtime was reachable to host the blocking call.
    #[error("no tokio runtime available to run blocking work")]
    NoRuntime,

    /// The runtime dropped the blocking task before it produced a value.
    #[error("blocking worker was cancelled before completion")]
    WorkerCancelled,
}

/// Facade error, generic over the driver's own error type.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// Error raised by the wrapped driver, unchanged.
    #[error(transparent)]
    Driver(E),

    /// Operation on a connection or cursor that was already closed.
    #[error("{0} is closed")]
    Closed(Resource),

    /// The blocking call could not be run to completion.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl<E> Error<E> {
    #[must_use]
    pub const fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    #[must_use]
    pub const fn is_executor(&self) -> bool {
        matches!(self, Self::Executor(_))
    }

    /// Borrow the driver error, if this is one.
    #[must_use]
    pub const fn driver_error(&self) -> Option<&E> {
        match self {
            Self::Driver(e) => Some(e),
            _ => None,
        }
    }

    /// Take the driver error, if this is one.
    #[must_use]
    pub fn into_driver(self) -> Option<E> {
        match self {
            Self::Driver(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;

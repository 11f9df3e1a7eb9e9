//! The seam between the facades and a synchronous database driver.
//!
//! A driver is anything that can open a connection, hand out cursors, execute a
//! statement and produce rows, all with blocking calls. The facades never look
//! inside rows, parameters or errors; they only move them around.
//!
//! Implementations must be `Send` so the facade can run [`DriverCursor::execute`]
//! on a worker thread. They need not be `Sync`.

use std::error::Error as StdError;

/// A configuration that knows how to open a driver connection.
///
/// The configuration is handed over verbatim; any validation is the driver's.
pub trait Connect: Send + 'static {
    /// Connection produced by this configuration.
    type Connection: DriverConnection<Error = Self::Error>;
    /// Error raised by the driver.
    type Error: StdError + Send + Sync + 'static;

    /// Open a connection. Blocks.
    fn connect(self) -> Result<Self::Connection, Self::Error>;
}

/// An open driver connection.
pub trait DriverConnection: Send + 'static {
    /// Cursor type created by [`DriverConnection::cursor`].
    type Cursor: DriverCursor<Error = Self::Error>;
    /// Error raised by the driver.
    type Error: StdError + Send + Sync + 'static;

    /// Create a cursor bound to this connection.
    fn cursor(&mut self) -> Result<Self::Cursor, Self::Error>;

    /// Release the connection. Called at most once by the facade.
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// An open driver cursor.
pub trait DriverCursor: Send + 'static {
    /// Positional parameter value bound to statement placeholders.
    type Param: Send + 'static;
    /// Row representation produced by the driver.
    type Row;
    /// Error raised by the driver.
    type Error: StdError + Send + Sync + 'static;

    /// Execute `statement`, replacing any pending result set.
    fn execute(&mut self, statement: &str, params: &[Self::Param]) -> Result<(), Self::Error>;

    /// Next row of the current result set, `None` when exhausted.
    fn fetchone(&mut self) -> Result<Option<Self::Row>, Self::Error>;

    /// All remaining rows of the current result set.
    fn fetchall(&mut self) -> Result<Vec<Self::Row>, Self::Error>;

    /// Release the cursor. Called at most once by the facade.
    fn close(&mut self) -> Result<(), Self::Error>;
}

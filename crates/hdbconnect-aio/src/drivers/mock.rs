//! Scripted in-memory driver for facade tests.
//!
//! Statements understood by the cursor:
//! - `SELECT <n>`: one row `[n]`
//! - `SELECT ...` with parameters: one row holding the parameters
//! - any other `SELECT ...`: no rows
//! - anything else: [`MockError::Syntax`]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Once;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::driver::{Connect, DriverConnection, DriverCursor};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("syntax error near {0:?}")]
    Syntax(String),

    #[error("connection refused")]
    Refused,

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("close failed")]
    CloseFailed,
}

/// Shared call log and behaviour knobs.
#[derive(Debug, Default)]
pub struct Script {
    delay: Duration,
    fail_close: bool,
    connects: AtomicUsize,
    connection_closes: AtomicUsize,
    cursor_closes: AtomicUsize,
    completed: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn failing_close() -> Arc<Self> {
        Arc::new(Self {
            fail_close: true,
            ..Self::default()
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn connection_closes(&self) -> usize {
        self.connection_closes.load(Ordering::SeqCst)
    }

    pub fn cursor_closes(&self) -> usize {
        self.cursor_closes.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[derive(Debug)]
pub struct MockConfig {
    script: Arc<Script>,
    refuse: bool,
}

impl MockConfig {
    pub const fn new(script: Arc<Script>) -> Self {
        Self {
            script,
            refuse: false,
        }
    }

    pub const fn refusing(script: Arc<Script>) -> Self {
        Self {
            script,
            refuse: true,
        }
    }
}

impl Connect for MockConfig {
    type Connection = MockConnection;
    type Error = MockError;

    fn connect(self) -> Result<MockConnection, MockError> {
        if self.refuse {
            return Err(MockError::Refused);
        }
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            script: self.script,
            open: Arc::new(AtomicBool::new(true)),
        })
    }
}

#[derive(Debug)]
pub struct MockConnection {
    script: Arc<Script>,
    open: Arc<AtomicBool>,
}

impl DriverConnection for MockConnection {
    type Cursor = MockCursor;
    type Error = MockError;

    fn cursor(&mut self) -> Result<MockCursor, MockError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(MockError::ConnectionClosed);
        }
        Ok(MockCursor {
            script: Arc::clone(&self.script),
            connection_open: Arc::clone(&self.open),
            rows: VecDeque::new(),
        })
    }

    fn close(&mut self) -> Result<(), MockError> {
        self.open.store(false, Ordering::SeqCst);
        self.script.connection_closes.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_close {
            Err(MockError::CloseFailed)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct MockCursor {
    script: Arc<Script>,
    connection_open: Arc<AtomicBool>,
    rows: VecDeque<Vec<i64>>,
}

impl MockCursor {
    fn ensure_open(&self) -> Result<(), MockError> {
        if self.connection_open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MockError::ConnectionClosed)
        }
    }
}

impl DriverCursor for MockCursor {
    type Param = i64;
    type Row = Vec<i64>;
    type Error = MockError;

    fn execute(&mut self, statement: &str, params: &[i64]) -> Result<(), MockError> {
        self.ensure_open()?;
        self.rows.clear();
        self.script.executed.lock().push(statement.to_string());
        if !self.script.delay.is_zero() {
            thread::sleep(self.script.delay);
        }

        let Some(rest) = statement.strip_prefix("SELECT ") else {
            return Err(MockError::Syntax(statement.to_string()));
        };
        if !params.is_empty() {
            self.rows.push_back(params.to_vec());
        } else if let Ok(n) = rest.trim().parse::<i64>() {
            self.rows.push_back(vec![n]);
        }

        self.script.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fetchone(&mut self) -> Result<Option<Vec<i64>>, MockError> {
        self.ensure_open()?;
        Ok(self.rows.pop_front())
    }

    fn fetchall(&mut self) -> Result<Vec<Vec<i64>>, MockError> {
        self.ensure_open()?;
        Ok(self.rows.drain(..).collect())
    }

    fn close(&mut self) -> Result<(), MockError> {
        self.rows.clear();
        self.script.cursor_closes.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_close {
            Err(MockError::CloseFailed)
        } else {
            Ok(())
        }
    }
}

/// Route `tracing` output through the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

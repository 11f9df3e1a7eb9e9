//! Bundled driver implementations.
//!
//! - [`hana`]: SAP HANA via `hdbconnect` (feature `hana`)
//! - [`sqlite`]: SQLite via `rusqlite` (feature `sqlite`)

#[cfg(feature = "hana")]
pub mod hana;
#[cfg(test)]
pub(crate) mod mock;
#[cfg(any(feature = "hana", feature = "sqlite"))]
mod shared;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Database Module
///
/// The database layer sqlship executes change-scripts through.
///
/// ## Architecture
///
/// - **Driver seam** (this file): the `Driver` and `Session` traits. A driver
///   opens sessions from `DatabaseSettings`; a session exposes the transaction
///   primitives the orchestrator needs and nothing else.
/// - **Connection Management** (`connection.rs`): the per-run connection cache.
/// - **SQLite backend** (`sqlite.rs`): the bundled `rusqlite` driver.
///
/// ## Error Handling
///
/// Drivers report `DriverError`; the orchestrator wraps it into
/// `SqlshipError` together with the database name or script path.
pub mod connection;
pub mod sqlite;

pub use connection::*;
pub use sqlite::*;

use crate::config::DatabaseSettings;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a database driver.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The operation did not finish before its deadline and was interrupted
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Opens database sessions.
pub trait Driver {
    type Session: Session;

    /// Opens a session for `settings`. `client_tag` identifies this tool
    /// to the server where the backend supports it.
    fn connect(
        &self,
        settings: &DatabaseSettings,
        client_tag: &str,
    ) -> Result<Self::Session, DriverError>;
}

/// One open database connection.
///
/// Calls are strictly sequential: `begin`, then `execute`, then exactly one of
/// `commit` or `rollback`.
pub trait Session {
    /// Liveness check bounded by `timeout`.
    fn ping(&mut self, timeout: Duration) -> Result<(), DriverError>;

    fn begin(&mut self) -> Result<(), DriverError>;

    /// Runs the full script text inside the open transaction, interrupting it
    /// once `timeout` elapses.
    fn execute(&mut self, sql: &str, timeout: Duration) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;

    fn rollback(&mut self) -> Result<(), DriverError>;
}

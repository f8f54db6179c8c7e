/// SQLite backend
///
/// `rusqlite` implementation of the driver seam. Deadlines are enforced with a
/// watchdog thread holding the connection's interrupt handle.
use super::{Driver, DriverError, Session};
use crate::config::DatabaseSettings;
use rusqlite::{Connection, OpenFlags};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens SQLite databases named by `DatabaseSettings`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

/// An open SQLite connection.
#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
    database: String,
}

impl Driver for SqliteDriver {
    type Session = SqliteSession;

    fn connect(
        &self,
        settings: &DatabaseSettings,
        client_tag: &str,
    ) -> Result<SqliteSession, DriverError> {
        let uri = settings.connection_string();
        debug!(database = %settings.database, %uri, client = client_tag, "opening SQLite connection");

        let conn = Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        // Lock waits count against the connect timeout as well.
        conn.busy_timeout(settings.connect_timeout())?;

        Ok(SqliteSession {
            conn,
            database: settings.database.clone(),
        })
    }
}

impl SqliteSession {
    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Session for SqliteSession {
    fn ping(&mut self, timeout: Duration) -> Result<(), DriverError> {
        // Reading the schema table fails on files that are not databases.
        with_deadline(&self.conn, timeout, |conn| {
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })
        })
        .map(|_| ())
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, timeout: Duration) -> Result<(), DriverError> {
        with_deadline(&self.conn, timeout, |conn| conn.execute_batch(sql))
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        // SQLite already rolled back on interrupts and some I/O errors.
        if self.conn.is_autocommit() {
            debug!(database = %self.database, "transaction already rolled back by SQLite");
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Runs `op` and interrupts it if it is still running after `timeout`.
fn with_deadline<T, F>(conn: &Connection, timeout: Duration, op: F) -> Result<T, DriverError>
where
    F: FnOnce(&Connection) -> rusqlite::Result<T>,
{
    let handle = conn.get_interrupt_handle();
    let fired = Arc::new(AtomicBool::new(false));
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let watchdog = {
        let fired = Arc::clone(&fired);
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
                fired.store(true, Ordering::SeqCst);
                handle.interrupt();
            }
        })
    };

    let result = op(conn);
    drop(done_tx);
    if watchdog.join().is_err() {
        warn!("deadline watchdog thread panicked");
    }

    match result {
        Ok(value) => Ok(value),
        Err(_) if fired.load(Ordering::SeqCst) => Err(DriverError::Timeout(timeout)),
        Err(e) => Err(DriverError::Sqlite(e)),
    }
}

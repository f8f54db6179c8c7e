/// Connection Management Module
///
/// Per-run connection cache. One `ConnectionProvider` is created for each
/// orchestrator run and owns every session it opens; dropping it closes them.

use super::{Driver, Session};
use crate::config::DatabaseSettings;
use crate::core::{Result, SqlshipError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, info};

/// Resolves logical database names to live sessions.
pub struct ConnectionProvider<'d, D: Driver> {
    driver: &'d D,
    client_tag: String,
    sessions: HashMap<String, D::Session>,
}

impl<'d, D: Driver> ConnectionProvider<'d, D> {
    /// Creates an empty provider.
    ///
    /// # Arguments
    ///
    /// * `driver` - Backend used to open sessions
    /// * `client_tag` - Identifies this tool to the database server
    pub fn new(driver: &'d D, client_tag: impl Into<String>) -> Self {
        ConnectionProvider {
            driver,
            client_tag: client_tag.into(),
            sessions: HashMap::new(),
        }
    }

    /// Returns the cached session for `settings.database`, opening and
    /// pinging a new one on first use.
    ///
    /// # Returns
    ///
    /// The live session, or `SqlshipError::ConnectionFailed` if opening or the
    /// ping failed. Failed attempts are not cached, so the next call retries.
    pub fn resolve(&mut self, settings: &DatabaseSettings) -> Result<&mut D::Session> {
        match self.sessions.entry(settings.database.clone()) {
            Entry::Occupied(entry) => {
                debug!(database = %settings.database, "reusing cached connection");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let session = open(self.driver, &self.client_tag, settings)?;
                Ok(entry.insert(session))
            }
        }
    }

    /// Number of sessions currently held.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}

fn open<D: Driver>(driver: &D, client_tag: &str, settings: &DatabaseSettings) -> Result<D::Session> {
    let fail = |source| SqlshipError::ConnectionFailed {
        database: settings.database.clone(),
        source,
    };

    let mut session = driver.connect(settings, client_tag).map_err(fail)?;
    session.ping(settings.connect_timeout()).map_err(fail)?;

    info!(database = %settings.database, client = client_tag, "connected");
    Ok(session)
}

impl<D: Driver> Drop for ConnectionProvider<'_, D> {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            debug!(count = self.sessions.len(), "releasing database connections");
        }
    }
}

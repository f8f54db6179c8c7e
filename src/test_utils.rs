/// # Test Utilities Module
///
/// Shared fixtures for unit tests:
/// - `RecordingDriver`: in-memory driver that logs every call and fails on demand
/// - `MemoryScripts`: script source backed by a map, counting reads
/// - `TempDatabase` / `ScriptTree`: real SQLite files and script folders in temp dirs

use crate::config::DatabaseSettings;
use crate::core::db::{Driver, DriverError, Session};
use crate::orchestrator::ScriptSource;
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

/// One driver call, tagged with the database it went to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(String),
    Ping(String),
    Begin(String),
    Execute(String, String),
    Commit(String),
    Rollback(String),
}

#[derive(Debug, Default)]
struct Failures {
    connect: HashSet<String>,
    ping: HashSet<String>,
    execute_markers: Vec<String>,
    begin: bool,
    commit: bool,
    rollback: bool,
}

/// Driver double that records calls instead of talking to a database.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    events: Rc<RefCell<Vec<Event>>>,
    failures: Rc<Failures>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn failures_mut(&mut self) -> &mut Failures {
        Rc::get_mut(&mut self.failures).expect("configure failures before opening sessions")
    }

    pub fn fail_connect(mut self, database: &str) -> Self {
        self.failures_mut().connect.insert(database.to_string());
        self
    }

    pub fn fail_ping(mut self, database: &str) -> Self {
        self.failures_mut().ping.insert(database.to_string());
        self
    }

    /// Fails every `execute` whose SQL contains `marker`.
    pub fn fail_execute_containing(mut self, marker: &str) -> Self {
        self.failures_mut().execute_markers.push(marker.to_string());
        self
    }

    pub fn fail_begin(mut self) -> Self {
        self.failures_mut().begin = true;
        self
    }

    pub fn fail_commit(mut self) -> Self {
        self.failures_mut().commit = true;
        self
    }

    pub fn fail_rollback(mut self) -> Self {
        self.failures_mut().rollback = true;
        self
    }

    /// A session that bypasses `connect`, for transaction-level tests.
    pub fn session(&self, database: &str) -> RecordingSession {
        RecordingSession {
            database: database.to_string(),
            events: Rc::clone(&self.events),
            failures: Rc::clone(&self.failures),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Connect(_)))
            .count()
    }

    /// SQL passed to `execute`, in call order, including failed attempts.
    pub fn executed_sql(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Execute(_, sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Driver for RecordingDriver {
    type Session = RecordingSession;

    fn connect(
        &self,
        settings: &DatabaseSettings,
        _client_tag: &str,
    ) -> Result<RecordingSession, DriverError> {
        let database = settings.database.clone();
        self.events.borrow_mut().push(Event::Connect(database.clone()));
        if self.failures.connect.contains(&database) {
            return Err(DriverError::Other(format!("cannot reach {}", database)));
        }
        Ok(self.session(&database))
    }
}

pub struct RecordingSession {
    database: String,
    events: Rc<RefCell<Vec<Event>>>,
    failures: Rc<Failures>,
}

impl RecordingSession {
    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn fail_if(&self, fail: bool, what: &str) -> Result<(), DriverError> {
        if fail {
            Err(DriverError::Other(format!("{} failed on {}", what, self.database)))
        } else {
            Ok(())
        }
    }
}

impl Session for RecordingSession {
    fn ping(&mut self, _timeout: Duration) -> Result<(), DriverError> {
        self.record(Event::Ping(self.database.clone()));
        self.fail_if(self.failures.ping.contains(&self.database), "ping")
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.record(Event::Begin(self.database.clone()));
        self.fail_if(self.failures.begin, "begin")
    }

    fn execute(&mut self, sql: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.record(Event::Execute(self.database.clone(), sql.to_string()));
        let fail = self.failures.execute_markers.iter().any(|m| sql.contains(m.as_str()));
        self.fail_if(fail, "execute")
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.record(Event::Commit(self.database.clone()));
        self.fail_if(self.failures.commit, "commit")
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.record(Event::Rollback(self.database.clone()));
        self.fail_if(self.failures.rollback, "rollback")
    }
}

/// Script source over an in-memory map.
#[derive(Debug, Default)]
pub struct MemoryScripts {
    files: HashMap<PathBuf, String>,
    reads: Cell<usize>,
}

impl MemoryScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, sql: &str) -> Self {
        self.files.insert(path.into(), sql.to_string());
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl ScriptSource for MemoryScripts {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.reads.set(self.reads.get() + 1);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// An empty SQLite database in its own temp directory.
pub struct TempDatabase {
    _dir: TempDir,
    name: String,
    path: PathBuf,
}

impl TempDatabase {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{}.db", name));
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 1;").unwrap();

        TempDatabase {
            _dir: dir,
            name: name.to_string(),
            path,
        }
    }

    pub fn settings(&self) -> DatabaseSettings {
        let mut settings = DatabaseSettings::new(self.name.as_str());
        settings.path = Some(self.path.clone());
        settings
    }

    fn count_objects(&self, kind: &str, name: &str) -> i64 {
        let conn = Connection::open(&self.path).unwrap();
        conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap()
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.count_objects("table", name) == 1
    }

    pub fn view_exists(&self, name: &str) -> bool {
        self.count_objects("view", name) == 1
    }
}

/// A scripts root directory populated with files.
pub struct ScriptTree {
    dir: TempDir,
}

impl ScriptTree {
    pub fn new() -> Self {
        ScriptTree {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn add(self, relative: &str, sql: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, sql).unwrap();
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

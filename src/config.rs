use crate::core::{Result, SqlshipError};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Connection settings, one entry per logical database.
    #[serde(default)]
    pub databases: Vec<DatabaseSettings>,
    /// Recognized groups in execution order. Scripts in any other group are
    /// rejected as validation issues.
    #[serde(default = "default_changes_order")]
    pub changes_order: Vec<String>,
}

/// Connection settings for one logical database.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    /// Logical name, matched against the first segment of script paths.
    pub database: String,
    /// SQLite database file. Defaults to `<database>.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_sec: u64,
    #[serde(default = "default_query_exec_timeout")]
    pub query_exec_timeout_sec: u64,
}

fn default_changes_order() -> Vec<String> {
    vec!["procs".to_string(), "funcs".to_string(), "views".to_string()]
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_query_exec_timeout() -> u64 {
    15
}

impl DatabaseSettings {
    /// Settings with default timeouts and location.
    pub fn new(database: impl Into<String>) -> Self {
        DatabaseSettings {
            database: database.into(),
            path: None,
            connection_timeout_sec: default_connection_timeout(),
            query_exec_timeout_sec: default_query_exec_timeout(),
        }
    }

    /// Database file this entry points at.
    pub fn location(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.db", self.database)))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_sec)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.query_exec_timeout_sec)
    }

    /// SQLite URI for this database. `mode=rw` makes a missing file a
    /// connection failure instead of silently creating an empty database.
    pub fn connection_string(&self) -> String {
        let location = self.location();
        let mut encoded = String::new();
        for c in location.to_string_lossy().chars() {
            match c {
                '%' => encoded.push_str("%25"),
                '?' => encoded.push_str("%3f"),
                '#' => encoded.push_str("%23"),
                c => encoded.push(c),
            }
        }
        format!("file:{}?mode=rw", encoded)
    }
}

impl Config {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.changes_order.is_empty() {
            return Err(SqlshipError::Config(
                "changes_order must list at least one group".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for group in &self.changes_order {
            if group.is_empty() || group.contains('/') {
                return Err(SqlshipError::Config(format!(
                    "invalid group name '{}' in changes_order",
                    group
                )));
            }
            if !seen.insert(group.as_str()) {
                return Err(SqlshipError::Config(format!(
                    "group '{}' listed twice in changes_order",
                    group
                )));
            }
        }

        let mut names = HashSet::new();
        for db in &self.databases {
            if db.database.is_empty() {
                return Err(SqlshipError::Config(
                    "database entry without a name".to_string(),
                ));
            }
            if !names.insert(db.database.as_str()) {
                return Err(SqlshipError::Config(format!(
                    "database '{}' configured twice",
                    db.database
                )));
            }
            if db.connection_timeout_sec == 0 || db.query_exec_timeout_sec == 0 {
                return Err(SqlshipError::Config(format!(
                    "timeouts for database '{}' must be greater than zero",
                    db.database
                )));
            }
        }

        Ok(())
    }

    /// Looks up the connection settings for a logical database name.
    pub fn find_database(&self, name: &str) -> Option<&DatabaseSettings> {
        self.databases.iter().find(|d| d.database == name)
    }
}

/// Loads configuration from a TOML file at the given path.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        SqlshipError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    Config::from_toml(&content)
}

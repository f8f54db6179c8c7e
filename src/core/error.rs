/// sqlship Error Module
///
/// Error types for changeset preparation, connection handling and script
/// execution. Validation issues (unknown groups, duplicate paths) are not
/// errors; they live in `crate::changeset` and are reported, not raised.
use crate::core::db::DriverError;
use std::path::PathBuf;
use thiserror::Error;

/// Comprehensive error type for sqlship.
///
/// Every variant except the ambient ones (`Config`, `ConfigParse`, `Io`,
/// `Usage`) aborts the whole multi-database run.
#[derive(Error, Debug)]
pub enum SqlshipError {
    /// Changed-file path that does not look like `database/group/schema/file.sql`
    #[error("Invalid path format '{path}'. Expected format: db_name/group_folder/schema/script.sql")]
    InvalidPathShape { path: String },

    /// Databases referenced by the changeset that have no connection settings
    #[error("Database connection settings missing for: {}", .databases.join(", "))]
    MissingConnectionConfig { databases: Vec<String> },

    /// Opening or pinging a database failed
    #[error("Connection to database '{database}' failed: {source}")]
    ConnectionFailed {
        database: String,
        #[source]
        source: DriverError,
    },

    /// Script file could not be read at execution time
    #[error("File read error for {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Script failed and its transaction was rolled back
    #[error("Exec script error in {script}: {source}")]
    ScriptExecution {
        script: String,
        #[source]
        source: DriverError,
    },

    /// Script (or its commit) failed and the rollback failed too
    #[error("Exec script error in {script}: {source}; transaction rollback error: {rollback}")]
    RollbackFailed {
        script: String,
        #[source]
        source: DriverError,
        rollback: DriverError,
    },

    #[error("Transaction begin error for {script}: {source}")]
    TransactionBegin {
        script: String,
        #[source]
        source: DriverError,
    },

    #[error("Transaction commit error for {script}: {source}")]
    TransactionCommit {
        script: String,
        #[source]
        source: DriverError,
    },

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML in the configuration file
    #[error("Configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// File system and I/O errors outside script reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command-line usage
    #[error("Usage error: {0}")]
    Usage(String),
}

impl SqlshipError {
    /// Process exit code for this error.
    ///
    /// `2` for usage, configuration and input-shape problems the operator has
    /// to fix before re-running, `1` for failures while executing.
    pub fn exit_code(&self) -> i32 {
        match self {
            SqlshipError::InvalidPathShape { .. }
            | SqlshipError::MissingConnectionConfig { .. }
            | SqlshipError::Config(_)
            | SqlshipError::ConfigParse(_)
            | SqlshipError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Type alias for Result to use SqlshipError as the error type.
pub type Result<T> = std::result::Result<T, SqlshipError>;

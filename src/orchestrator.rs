//! Execution orchestrator.
//!
//! Walks a changeset database by database, in configured group order, schema
//! by schema, script by script, and runs every script in its own transaction.
//! The first failure ends the whole run: scripts later in the order may
//! depend on the one that failed.

use crate::changeset::{check_connection_settings, Changeset, ScriptPath};
use crate::config::{Config, DatabaseSettings};
use crate::core::db::{ConnectionProvider, Driver, Session};
use crate::core::{Result, SqlshipError};
use crate::report::{Reporter, ScriptOutcome};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Supplies script text.
pub trait ScriptSource {
    fn read(&self, path: &Path) -> io::Result<String>;
}

impl<T: ScriptSource + ?Sized> ScriptSource for &T {
    fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path)
    }
}

/// Reads scripts from the file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsScripts;

impl ScriptSource for FsScripts {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Whether scripts are executed or only listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    /// Same validation, ordering and report; no file reads, no connections.
    DryRun,
}

/// Totals for a successful run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub databases: usize,
    pub applied: usize,
    pub skipped: usize,
}

/// Applies changesets against the configured databases.
pub struct Orchestrator<'a, D: Driver, S: ScriptSource> {
    settings: &'a [DatabaseSettings],
    group_order: &'a [String],
    driver: &'a D,
    scripts: S,
    mode: RunMode,
    client_tag: String,
}

impl<'a, D: Driver, S: ScriptSource> Orchestrator<'a, D, S> {
    pub fn new(config: &'a Config, driver: &'a D, scripts: S, mode: RunMode) -> Self {
        Orchestrator {
            settings: &config.databases,
            group_order: &config.changes_order,
            driver,
            scripts,
            mode,
            client_tag: crate::client_tag(),
        }
    }

    /// Applies `changeset`, writing progress to `reporter`.
    ///
    /// Every database must have connection settings; this is checked for all
    /// of them before anything is opened or read. Connections opened by the
    /// run are closed when it returns, successfully or not.
    pub fn apply<W: Write>(
        &self,
        changeset: &Changeset,
        reporter: &mut Reporter<W>,
    ) -> Result<RunSummary> {
        let missing = check_connection_settings(changeset, self.settings);
        if !missing.is_empty() {
            return Err(SqlshipError::MissingConnectionConfig {
                databases: missing.into_iter().map(|issue| issue.subject).collect(),
            });
        }

        let mut provider = ConnectionProvider::new(self.driver, self.client_tag.clone());
        let mut summary = RunSummary::default();

        for (name, changes) in changeset.databases() {
            let settings = self.find_settings(name)?;
            info!(database = name, mode = ?self.mode, "applying database changes");
            reporter.database(name)?;

            let mut session = match self.mode {
                RunMode::DryRun => None,
                RunMode::Apply => Some(provider.resolve(settings)?),
            };

            for group_name in self.group_order {
                let Some(group) = changes.group(group_name) else {
                    continue;
                };
                reporter.group(group_name)?;

                for (schema, scripts) in group.schemas() {
                    reporter.schema(schema)?;

                    for script in scripts {
                        match session.as_deref_mut() {
                            None => {
                                reporter.script(&script.relative, ScriptOutcome::Skipped)?;
                                summary.skipped += 1;
                            }
                            Some(session) => {
                                self.run_script(session, script, settings.exec_timeout(), reporter)?;
                                summary.applied += 1;
                            }
                        }
                    }
                }
            }

            reporter.end_database()?;
            summary.databases += 1;
        }

        Ok(summary)
    }

    fn find_settings(&self, database: &str) -> Result<&'a DatabaseSettings> {
        self.settings
            .iter()
            .find(|s| s.database == database)
            .ok_or_else(|| SqlshipError::MissingConnectionConfig {
                databases: vec![database.to_string()],
            })
    }

    fn run_script<W: Write>(
        &self,
        session: &mut D::Session,
        script: &ScriptPath,
        timeout: Duration,
        reporter: &mut Reporter<W>,
    ) -> Result<()> {
        let sql = self
            .scripts
            .read(&script.full_path)
            .map_err(|source| SqlshipError::FileRead {
                path: script.full_path.clone(),
                source,
            })?;

        match execute_in_transaction(session, &script.relative, &sql, timeout) {
            Ok(()) => {
                reporter.script(&script.relative, ScriptOutcome::Applied)?;
                Ok(())
            }
            Err(err) => {
                let outcome = match err {
                    SqlshipError::ScriptExecution { .. } | SqlshipError::TransactionCommit { .. } => {
                        ScriptOutcome::RolledBack
                    }
                    _ => ScriptOutcome::Failed,
                };
                // The script error matters more than a broken report stream.
                if let Err(report_err) = reporter.script(&script.relative, outcome) {
                    warn!(error = %report_err, "failed to write report line");
                }
                Err(err)
            }
        }
    }
}

/// Runs one script in its own transaction: commit on success, rollback on
/// any execution or commit failure.
pub fn execute_in_transaction<T: Session>(
    session: &mut T,
    script: &str,
    sql: &str,
    timeout: Duration,
) -> Result<()> {
    session
        .begin()
        .map_err(|source| SqlshipError::TransactionBegin {
            script: script.to_string(),
            source,
        })?;
    debug!(script, "transaction started");

    let failure = match session.execute(sql, timeout) {
        Ok(()) => match session.commit() {
            Ok(()) => {
                debug!(script, "transaction committed");
                return Ok(());
            }
            Err(source) => SqlshipError::TransactionCommit {
                script: script.to_string(),
                source,
            },
        },
        Err(source) => SqlshipError::ScriptExecution {
            script: script.to_string(),
            source,
        },
    };

    warn!(script, error = %failure, "rolling back transaction");
    match session.rollback() {
        Ok(()) => Err(failure),
        Err(rollback) => Err(match failure {
            SqlshipError::ScriptExecution { script, source }
            | SqlshipError::TransactionCommit { script, source } => {
                SqlshipError::RollbackFailed {
                    script,
                    source,
                    rollback,
                }
            }
            other => other,
        }),
    }
}

//! Command-line front end: flags, the run sequence and its console output.
use crate::changes::read_changed_files;
use crate::changeset::{check_connection_settings, format_issues, Changeset};
use crate::config::{load_config, DEFAULT_CONFIG_FILE};
use crate::core::db::SqliteDriver;
use crate::core::{Result, SqlshipError};
use crate::orchestrator::{FsScripts, Orchestrator, RunMode, RunSummary};
use crate::report::Reporter;
use clap::{ArgGroup, Parser};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sqlship")]
#[command(about = "Apply changed SQL scripts to their databases in a fixed, grouped order", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("changes").required(true).args(["file", "stdin"])))]
pub struct Cli {
    /// Path to config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Read changed files list from a file
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Read changed files list from stdin
    #[arg(short = 'i', long = "stdin")]
    pub stdin: bool,

    /// Show files that will be processed without actual processing
    #[arg(long)]
    pub dry_run: bool,

    /// Path to directory with database sql files
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Apply
        }
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed(RunSummary),
    /// Empty change list, or every change failed validation
    NothingToDo,
}

/// Runs the full sequence: config, change list, changeset, pre-flight, apply.
///
/// Console output goes to `out`; `stdin` is only read with `-i`.
pub fn run<R: BufRead, W: Write>(cli: &Cli, stdin: R, out: &mut W) -> Result<Outcome> {
    let config = load_config(&cli.config)?;
    let mode = cli.mode();
    info!(config = %cli.config.display(), ?mode, "configuration loaded");

    match mode {
        RunMode::DryRun => writeln!(
            out,
            "DRY-RUN MODE. Show files that will be processed without actual processing"
        )?,
        RunMode::Apply => writeln!(out, "REAL MODE. Run DB scripts")?,
    }
    if let Some(dir) = &cli.dir {
        writeln!(out, "Using folder: {}", dir.display())?;
    }
    writeln!(out, "Groups exec order: {}", config.changes_order.join(", "))?;

    let changed = match (&cli.file, cli.stdin) {
        (Some(path), false) => {
            let file = File::open(path).map_err(|e| {
                SqlshipError::Usage(format!("cannot open changes file {}: {}", path.display(), e))
            })?;
            read_changed_files(BufReader::new(file))?
        }
        (None, true) => read_changed_files(stdin)?,
        _ => {
            return Err(SqlshipError::Usage(
                "use exactly one of -i or -f to supply the changes list".to_string(),
            ))
        }
    };

    if changed.is_empty() {
        writeln!(out, "No changes found. Nothing to execute")?;
        return Ok(Outcome::NothingToDo);
    }

    let root = cli.dir.clone().unwrap_or_default();
    let (changeset, issues) = Changeset::build(&root, &changed, &config.changes_order)?;

    if !issues.is_empty() {
        writeln!(
            out,
            "\n! Ignoring files with path validation errors:\n{}",
            format_issues(&issues)
        )?;
    }
    writeln!(out)?;

    if changeset.is_empty() {
        writeln!(out, "No valid changes to execute. Exiting")?;
        return Ok(Outcome::NothingToDo);
    }

    let missing = check_connection_settings(&changeset, &config.databases);
    if !missing.is_empty() {
        writeln!(
            out,
            "ERROR! Some DB connection settings missing:\n{}",
            format_issues(&missing)
        )?;
        writeln!(out, "Check the config file contents at {}", cli.config.display())?;
        return Err(SqlshipError::MissingConnectionConfig {
            databases: missing.into_iter().map(|issue| issue.subject).collect(),
        });
    }

    writeln!(out, "Run sql scripts...")?;
    let driver = SqliteDriver;
    let orchestrator = Orchestrator::new(&config, &driver, FsScripts, mode);
    let summary = {
        let mut reporter = Reporter::new(&mut *out);
        orchestrator.apply(&changeset, &mut reporter)?
    };

    writeln!(
        out,
        "Completed. OK. {} applied, {} skipped across {} database(s)",
        summary.applied, summary.skipped, summary.databases
    )?;
    Ok(Outcome::Completed(summary))
}

//! Progress report written while a changeset is applied.
//!
//! One line per database, group, schema and script, indented by level, so a
//! dry-run report reads exactly like the real run it previews.
use std::io::{self, Write};

/// Outcome marker printed after a script path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    Applied,
    Skipped,
    RolledBack,
    /// Failed with nothing rolled back, or the rollback failed as well
    Failed,
}

impl ScriptOutcome {
    pub fn marker(self) -> &'static str {
        match self {
            ScriptOutcome::Applied => "-> OK",
            ScriptOutcome::Skipped => ">> skipped (dry-run)",
            ScriptOutcome::RolledBack => "!! FAILED, rolled back",
            ScriptOutcome::Failed => "!! FAILED",
        }
    }
}

/// Writes the progress stream to any `Write` sink.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Reporter { out }
    }

    pub fn database(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "= Database: {} =", name)
    }

    pub fn group(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "  - group: {}", name)
    }

    pub fn schema(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "    - schema: {}", name)
    }

    pub fn script(&mut self, relative: &str, outcome: ScriptOutcome) -> io::Result<()> {
        writeln!(self.out, "      - {} {}", relative, outcome.marker())
    }

    /// Blank separator after a database.
    pub fn end_database(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

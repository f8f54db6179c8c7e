//! Changeset construction.
//!
//! Folds changed-file paths into database -> group -> schema -> files buckets,
//! collecting validation issues for files that cannot be applied instead of
//! stopping at the first one.

pub mod script_path;

pub use script_path::{ScriptPath, SCRIPT_EXTENSION};

use crate::config::DatabaseSettings;
use crate::core::Result;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// What a validation issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Script group is not one of the configured groups
    UnrecognizedGroup,
    /// The same path was listed more than once
    DuplicatePath,
    /// Database has no connection settings
    MissingConnectionConfig,
}

/// A reported, non-fatal problem with one input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Script path or database name the issue refers to.
    pub subject: String,
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Renders issues as a bullet list, one per line.
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("- {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scripts for one group, bucketed by schema.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GroupChanges {
    schemas: BTreeMap<String, Vec<ScriptPath>>,
}

impl GroupChanges {
    /// Schemas in ascending name order, each with its scripts sorted by file name.
    pub fn schemas(&self) -> impl Iterator<Item = (&str, &[ScriptPath])> {
        self.schemas
            .iter()
            .map(|(name, scripts)| (name.as_str(), scripts.as_slice()))
    }

    pub fn schema(&self, name: &str) -> Option<&[ScriptPath]> {
        self.schemas.get(name).map(Vec::as_slice)
    }
}

/// Scripts for one database, bucketed by group.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DatabaseChanges {
    groups: BTreeMap<String, GroupChanges>,
}

impl DatabaseChanges {
    pub fn group(&self, name: &str) -> Option<&GroupChanges> {
        self.groups.get(name)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

/// Validated scripts to apply, keyed by database, group and schema.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Changeset {
    databases: BTreeMap<String, DatabaseChanges>,
}

impl Changeset {
    /// Builds a changeset from changed-file paths.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory the relative paths are resolved against
    /// * `paths` - Relative script paths, `database/group/schema/file.sql`
    /// * `allowed_groups` - Recognized group names
    ///
    /// # Returns
    ///
    /// The changeset and the issues for every excluded path. A malformed path
    /// fails the whole build with `SqlshipError::InvalidPathShape`.
    pub fn build<S: AsRef<str>>(
        root: &Path,
        paths: &[S],
        allowed_groups: &[String],
    ) -> Result<(Changeset, Vec<ValidationIssue>)> {
        let mut changeset = Changeset::default();
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for path in paths {
            let script = ScriptPath::parse(root, path.as_ref())?;

            if !allowed_groups.iter().any(|g| *g == script.group) {
                issues.push(ValidationIssue {
                    message: format!(
                        "group '{}' not recognized; valid groups: {}",
                        script.group,
                        allowed_groups.join(", ")
                    ),
                    subject: script.relative,
                    kind: IssueKind::UnrecognizedGroup,
                });
                continue;
            }

            if !seen.insert(script.relative.clone()) {
                issues.push(ValidationIssue {
                    subject: script.relative,
                    kind: IssueKind::DuplicatePath,
                    message: "listed more than once; applying it once".to_string(),
                });
                continue;
            }

            changeset.insert(script);
        }

        changeset.sort_scripts();
        debug!(
            databases = changeset.databases.len(),
            scripts = changeset.script_count(),
            issues = issues.len(),
            "changeset prepared"
        );
        Ok((changeset, issues))
    }

    fn insert(&mut self, script: ScriptPath) {
        self.databases
            .entry(script.database.clone())
            .or_default()
            .groups
            .entry(script.group.clone())
            .or_default()
            .schemas
            .entry(script.schema.clone())
            .or_default()
            .push(script);
    }

    /// Byte-wise by file name: `10_b.sql` sorts before `1_a.sql`.
    fn sort_scripts(&mut self) {
        for db in self.databases.values_mut() {
            for group in db.groups.values_mut() {
                for scripts in group.schemas.values_mut() {
                    scripts.sort_by(|a, b| a.file_name.as_bytes().cmp(b.file_name.as_bytes()));
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Databases in ascending name order.
    pub fn databases(&self) -> impl Iterator<Item = (&str, &DatabaseChanges)> {
        self.databases.iter().map(|(name, db)| (name.as_str(), db))
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseChanges> {
        self.databases.get(name)
    }

    /// Every script in the changeset.
    pub fn scripts(&self) -> impl Iterator<Item = &ScriptPath> {
        self.databases
            .values()
            .flat_map(|db| db.groups.values())
            .flat_map(|group| group.schemas.values())
            .flatten()
    }

    pub fn script_count(&self) -> usize {
        self.scripts().count()
    }
}

/// Reports every changeset database that has no connection settings.
pub fn check_connection_settings(
    changeset: &Changeset,
    settings: &[DatabaseSettings],
) -> Vec<ValidationIssue> {
    changeset
        .databases()
        .filter(|(name, _)| !settings.iter().any(|s| s.database == *name))
        .map(|(name, _)| ValidationIssue {
            subject: name.to_string(),
            kind: IssueKind::MissingConnectionConfig,
            message: "database has no connection settings".to_string(),
        })
        .collect()
}

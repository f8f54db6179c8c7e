//! Script path parsing.
//!
//! Changed-file paths follow `database/group/schema/script.sql`. Anything else
//! means the upstream tooling produced garbage, so it is a hard error rather
//! than a validation issue.

use crate::core::{Result, SqlshipError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Extension recognized as a change-script.
pub const SCRIPT_EXTENSION: &str = ".sql";

static SCRIPT_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^/]+)/([^/]+)/([^/]+)/([^/]+\.sql)$").expect("valid script path regex")
});

/// A parsed change-script path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPath {
    pub database: String,
    pub group: String,
    pub schema: String,
    pub file_name: String,
    /// The path as given in the changed-files list.
    pub relative: String,
    /// `relative` joined onto the scripts root directory.
    pub full_path: PathBuf,
}

impl ScriptPath {
    /// Parses `relative` and resolves it against `root`.
    ///
    /// # Errors
    ///
    /// `SqlshipError::InvalidPathShape` unless the path has exactly four
    /// non-empty segments and the last one is a `.sql` file name.
    pub fn parse(root: &Path, relative: &str) -> Result<ScriptPath> {
        let invalid = || SqlshipError::InvalidPathShape {
            path: relative.to_string(),
        };

        let caps = SCRIPT_PATH_RE.captures(relative).ok_or_else(invalid)?;
        let segment = |i: usize| caps.get(i).map(|m| m.as_str().to_string());

        let (database, group, schema, file_name) =
            match (segment(1), segment(2), segment(3), segment(4)) {
                (Some(d), Some(g), Some(s), Some(f)) => (d, g, s, f),
                _ => return Err(invalid()),
            };

        // Dot segments would resolve outside the scripts root.
        if [&database, &group, &schema]
            .iter()
            .any(|s| s.as_str() == "." || s.as_str() == "..")
        {
            return Err(invalid());
        }

        Ok(ScriptPath {
            database,
            group,
            schema,
            file_name,
            relative: relative.to_string(),
            full_path: root.join(relative),
        })
    }
}

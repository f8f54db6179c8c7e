//! Reading the changed-files list produced by version control.
use crate::changeset::SCRIPT_EXTENSION;
use crate::core::Result;
use std::io::BufRead;
use tracing::debug;

/// Reads one path per line, keeping only `.sql` files.
///
/// Surrounding whitespace (including `\r` from CRLF input) is trimmed and
/// blank lines are skipped. An empty result is not an error: there is simply
/// nothing to apply.
pub fn read_changed_files<R: BufRead>(input: R) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for line in input.lines() {
        let line = line?;
        let path = line.trim();
        if path.ends_with(SCRIPT_EXTENSION) {
            files.push(path.to_string());
        } else if !path.is_empty() {
            debug!(path, "ignoring non-script change");
        }
    }
    Ok(files)
}

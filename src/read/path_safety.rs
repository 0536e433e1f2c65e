//! Path safety validation for archive extraction.
//!
//! Entry names come from untrusted input and are joined onto the scratch
//! directory only after every component has been checked.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Validates an entry name and returns the path it extracts to under `dest`.
///
/// Both `/` and `\` are accepted as separators. Empty and `.` components are
/// dropped. The name is rejected with [`Error::PathTraversal`] if it:
/// - is absolute or carries a drive prefix (`C:`)
/// - contains a `..` component
/// - contains a NUL byte
/// - has no components left after normalisation
pub(crate) fn validate_entry_path(entry_index: usize, name: &str, dest: &Path) -> Result<PathBuf> {
    let reject = || Error::PathTraversal {
        entry_index,
        path: name.to_string(),
    };

    if name.contains('\0') || name.starts_with('/') || name.starts_with('\\') {
        return Err(reject());
    }

    let mut full_path = dest.to_path_buf();
    let mut depth = 0usize;
    for (i, component) in name.split(['/', '\\']).enumerate() {
        match component {
            "" | "." => continue,
            ".." => return Err(reject()),
            c if i == 0 && c.len() >= 2 && c.as_bytes()[1] == b':' => return Err(reject()),
            c => {
                full_path.push(c);
                depth += 1;
            }
        }
    }

    if depth == 0 {
        return Err(reject());
    }
    Ok(full_path)
}

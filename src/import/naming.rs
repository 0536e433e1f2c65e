//! Destination file naming for topic storage.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Extension every stored topic file carries.
pub const TOPIC_EXTENSION: &str = "csv";

/// Turns an arbitrary file name into a safe topic file name.
///
/// A trailing `.csv` (any case) is set aside and every character outside
/// `[A-Za-z0-9_-]`, spaces included, becomes `_`. If nothing is left a random `topic_<uuid>` name is used.
/// The result always ends in `.csv`.
///
/// # Example
///
/// ```rust
/// use vocabvault::import::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("My Words.CSV"), "My_Words.csv");
/// assert_eq!(sanitize_file_name("Wörter (B1)"), "W_rter__B1_.csv");
/// assert!(sanitize_file_name(".csv").starts_with("topic_"));
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let stem = strip_topic_extension(name);
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = if cleaned.is_empty() {
        format!("topic_{}", Uuid::new_v4().simple())
    } else {
        cleaned
    };
    format!("{}.{}", cleaned, TOPIC_EXTENSION)
}

fn strip_topic_extension(name: &str) -> &str {
    let split = name.len().checked_sub(TOPIC_EXTENSION.len() + 1);
    match split {
        Some(at)
            if name.is_char_boundary(at)
                && name[at..].starts_with('.')
                && name[at + 1..].eq_ignore_ascii_case(TOPIC_EXTENSION) =>
        {
            &name[..at]
        }
        _ => name,
    }
}

/// Picks a path in `dir` for `file_name` that no existing file occupies.
///
/// If `dir/file_name` is taken, `_1`, `_2`, ... is inserted before the
/// extension until a free name is found. Only `dir` is consulted, and a
/// dangling symlink counts as taken.
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !is_taken(&candidate) {
        return candidate;
    }

    let (stem, extension) = match file_name.rfind('.') {
        Some(dot) if dot > 0 => (&file_name[..dot], &file_name[dot..]),
        _ => (file_name, ""),
    };

    let mut suffix = 1u64;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, suffix, extension));
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

fn is_taken(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

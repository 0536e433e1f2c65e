//! Source file kind detection.
//!
//! Import dispatch is decided by file extension alone, compared
//! case-insensitively. Content sniffing is deliberately not used: a `.zip`
//! that is not a ZIP archive fails later in the central directory parser
//! with a precise error.

use std::path::Path;

use crate::{Error, Result};

/// Kind of file accepted by the import pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A single topic as comma-separated values.
    Csv,
    /// A ZIP archive containing topic CSV files.
    Zip,
}

impl SourceKind {
    /// Returns the canonical file extension for this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Zip => "zip",
        }
    }

    /// Maps an extension (without the leading dot) to a source kind.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vocabvault::format::detect::SourceKind;
    ///
    /// assert_eq!(SourceKind::from_extension("CSV"), Some(SourceKind::Csv));
    /// assert_eq!(SourceKind::from_extension("zip"), Some(SourceKind::Zip));
    /// assert_eq!(SourceKind::from_extension("txt"), None);
    /// ```
    pub fn from_extension(extension: &str) -> Option<Self> {
        if extension.eq_ignore_ascii_case("csv") {
            Some(SourceKind::Csv)
        } else if extension.eq_ignore_ascii_case("zip") {
            Some(SourceKind::Zip)
        } else {
            None
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Csv => write!(f, "CSV"),
            SourceKind::Zip => write!(f, "ZIP"),
        }
    }
}

/// Detects the kind of a source file from its path.
///
/// Fails with [`Error::UnsupportedFileType`] for any extension other than
/// `csv` or `zip`, including a missing extension.
pub fn detect_source_kind(path: impl AsRef<Path>) -> Result<SourceKind> {
    let extension = path
        .as_ref()
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();

    SourceKind::from_extension(&extension).ok_or(Error::UnsupportedFileType { extension })
}

/// Returns `true` if `path` has a `.csv` extension in any letter case.
pub fn is_csv_path(path: impl AsRef<Path>) -> bool {
    matches!(detect_source_kind(path), Ok(SourceKind::Csv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_source_kind("words.csv").unwrap(), SourceKind::Csv);
        assert_eq!(detect_source_kind("/a/b/Words.CsV").unwrap(), SourceKind::Csv);
        assert_eq!(detect_source_kind("topics.ZIP").unwrap(), SourceKind::Zip);
    }

    #[test]
    fn test_unsupported_extension() {
        match detect_source_kind("notes.txt") {
            Err(Error::UnsupportedFileType { extension }) => assert_eq!(extension, "txt"),
            other => panic!("expected UnsupportedFileType, got {:?}", other),
        }
        assert!(matches!(
            detect_source_kind("README"),
            Err(Error::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn test_is_csv_path() {
        assert!(is_csv_path("deck/a.CSV"));
        assert!(!is_csv_path("deck/a.csv.txt"));
        assert!(!is_csv_path("deck/csv"));
    }
}

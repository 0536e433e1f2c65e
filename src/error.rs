//! Error types for topic import and state reconciliation.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when importing vocabulary topics or restoring practice
//! state, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. You can
//! handle errors using pattern matching or the `?` operator:
//!
//! ```rust,no_run
//! use vocabvault::{Error, ImportPipeline};
//!
//! fn import(path: &str) -> vocabvault::Result<usize> {
//!     let pipeline = ImportPipeline::new("./topics");
//!     match pipeline.import_topics(path) {
//!         Ok(result) => Ok(result.count()),
//!         Err(Error::NoCsvInArchive) => {
//!             eprintln!("The archive does not contain any .csv topic files.");
//!             Ok(0)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```
//!
//! ## User-Friendly Error Messages
//!
//! The [`Error`] type implements [`std::fmt::Display`] with messages that can
//! be shown to the user as-is:
//!
//! ```rust
//! use vocabvault::Error;
//!
//! let error = Error::UnsupportedFileType { extension: "pdf".into() };
//! assert_eq!(error.to_string(), "Unsupported file type: .pdf (expected .csv or .zip)");
//! ```

use std::io;
use std::path::PathBuf;

/// The main error type for import and reconciliation operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io], [`CopyFailed`][Self::CopyFailed] | File system operations |
/// | Input | [`UnsupportedFileType`][Self::UnsupportedFileType], [`NoCsvInArchive`][Self::NoCsvInArchive], [`FileMissing`][Self::FileMissing] | Wrong file picked |
/// | Format | [`MalformedArchive`][Self::MalformedArchive], [`ParsingFailed`][Self::ParsingFailed], [`SnapshotFormat`][Self::SnapshotFormat] | Invalid data |
/// | Compatibility | [`UnsupportedCompression`][Self::UnsupportedCompression], [`UnsupportedFeature`][Self::UnsupportedFeature] | ZIP variants we do not read |
/// | Integrity | [`CrcMismatch`][Self::CrcMismatch], [`DecompressionFailed`][Self::DecompressionFailed] | Data corruption |
/// | Security | [`PathTraversal`][Self::PathTraversal], [`ResourceLimitExceeded`][Self::ResourceLimitExceeded] | Hostile archives |
/// | State | [`StoresUnavailable`][Self::StoresUnavailable] | Call order |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred outside of a copy into topic storage.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source file is neither a `.csv` nor a `.zip` file.
    #[error("Unsupported file type: .{extension} (expected .csv or .zip)")]
    UnsupportedFileType {
        /// The (possibly empty) extension of the rejected file.
        extension: String,
    },

    /// The ZIP structure is invalid.
    ///
    /// Returned for a missing end-of-central-directory record, bad record
    /// signatures, offsets pointing outside the buffer, and entries written in
    /// streaming mode (general purpose flag bit 3). The whole import is aborted;
    /// nothing is written to topic storage.
    #[error("Malformed archive at offset {offset:#x}: {reason}")]
    MalformedArchive {
        /// Byte offset where the inconsistency was detected.
        offset: u64,
        /// Description of the problem.
        reason: String,
    },

    /// An entry uses a compression method other than stored or deflate.
    #[error("Unsupported compression method {method} for entry '{entry}'")]
    UnsupportedCompression {
        /// The entry name.
        entry: String,
        /// The raw ZIP method number.
        method: u16,
    },

    /// The archive uses a ZIP feature this crate does not read.
    #[error("Unsupported archive feature: {feature}")]
    UnsupportedFeature {
        /// Name of the feature.
        feature: &'static str,
    },

    /// The inflate routine ended in a state other than "stream ended".
    #[error("Failed to decompress '{entry}': {reason}")]
    DecompressionFailed {
        /// The entry name.
        entry: String,
        /// Description reported by the decompressor.
        reason: String,
    },

    /// The extracted bytes do not match the CRC-32 stored in the archive.
    #[error("CRC mismatch for '{entry}': expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        /// The entry name.
        entry: String,
        /// CRC stored in the central directory.
        expected: u32,
        /// CRC of the extracted data.
        actual: u32,
    },

    /// An archive entry name would escape the extraction directory.
    #[error("Path traversal detected in entry {entry_index}: {path}")]
    PathTraversal {
        /// Index of the entry in the central directory.
        entry_index: usize,
        /// The offending entry name.
        path: String,
    },

    /// A configured resource limit was exceeded.
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// The archive was valid but contained no `.csv` files.
    #[error("The archive does not contain any CSV files")]
    NoCsvInArchive,

    /// Copying or writing a file into topic storage failed.
    ///
    /// Any copy failure aborts the rest of the import call.
    #[error("Failed to copy into '{}': {source}", path.display())]
    CopyFailed {
        /// Destination that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reconciliation was requested before practice and progress stores were bound.
    #[error("Practice and progress stores are not available")]
    StoresUnavailable,

    /// Every data row of a CSV file lacks the required columns.
    #[error("Could not parse '{file_name}': no row has source and target columns")]
    ParsingFailed {
        /// Name of the file that failed to parse.
        file_name: String,
    },

    /// No CSV file is available in either the bundled or the user topic location.
    #[error("No vocabulary CSV files were found")]
    FileMissing,

    /// A snapshot document could not be encoded or decoded.
    #[error("Invalid snapshot document: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}

impl Error {
    /// Builds a [`Error::MalformedArchive`] from an offset and reason.
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedArchive {
            offset: offset as u64,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error indicates damaged archive data.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::MalformedArchive { .. }
                | Error::CrcMismatch { .. }
                | Error::DecompressionFailed { .. }
        )
    }

    /// Returns `true` if this error is related to unsupported inputs.
    ///
    /// These errors indicate the file is of a kind or variant this build does
    /// not handle, rather than being damaged.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFileType { .. }
                | Error::UnsupportedCompression { .. }
                | Error::UnsupportedFeature { .. }
        )
    }

    /// Returns `true` if this error indicates a security issue.
    pub fn is_security_error(&self) -> bool {
        matches!(
            self,
            Error::PathTraversal { .. } | Error::ResourceLimitExceeded(_)
        )
    }

    /// Returns the archive entry name associated with this error, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vocabvault::Error;
    ///
    /// let error = Error::UnsupportedCompression { entry: "a.csv".into(), method: 12 };
    /// assert_eq!(error.entry_name(), Some("a.csv"));
    /// assert_eq!(Error::NoCsvInArchive.entry_name(), None);
    /// ```
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::UnsupportedCompression { entry, .. }
            | Error::DecompressionFailed { entry, .. }
            | Error::CrcMismatch { entry, .. } => Some(entry),
            Error::PathTraversal { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// A specialized [`Result`] type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MalformedArchive {
            offset: 0x1234,
            reason: "bad signature".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed archive at offset 0x1234: bad signature"
        );

        let err = Error::CrcMismatch {
            entry: "a.csv".into(),
            expected: 0x12345678,
            actual: 0xabcdef00,
        };
        assert!(err.to_string().contains("0x12345678"));
        assert!(err.to_string().contains("a.csv"));
    }

    #[test]
    fn test_copy_failed_keeps_source() {
        use std::error::Error as _;

        let err = Error::CopyFailed {
            path: PathBuf::from("/topics/a.csv"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("a.csv"));
    }

    #[test]
    fn test_classification() {
        assert!(Error::malformed(4, "x").is_corruption());
        assert!(!Error::malformed(4, "x").is_unsupported());
        assert!(
            Error::UnsupportedFeature {
                feature: "ZIP64"
            }
            .is_unsupported()
        );
        assert!(Error::ResourceLimitExceeded("too big".into()).is_security_error());
        assert!(!Error::NoCsvInArchive.is_corruption());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

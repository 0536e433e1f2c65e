//! Process exit codes.

use vocabvault::Error;

pub const SUCCESS: i32 = 0;
/// Finished, but something was skipped or left unchanged.
pub const WARNING: i32 = 1;
pub const FATAL_ERROR: i32 = 2;
/// The archive could not be read.
pub const BAD_ARCHIVE: i32 = 3;
/// No usable topic data was found.
pub const NO_TOPICS: i32 = 4;
pub const IO_ERROR: i32 = 5;
/// 128 + SIGINT
pub const USER_INTERRUPT: i32 = 130;
pub const BAD_ARGS: i32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Warning,
    FatalError,
    BadArchive,
    NoTopics,
    IoError,
    BadArgs,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::Warning => WARNING,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::NoTopics => NO_TOPICS,
            Self::IoError => IO_ERROR,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Picks the exit code reported for a failed command.
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    if error.is_corruption() || error.is_security_error() {
        return ExitCode::BadArchive;
    }
    match error {
        Error::UnsupportedFileType { .. } => ExitCode::BadArgs,
        Error::UnsupportedCompression { .. } | Error::UnsupportedFeature { .. } => {
            ExitCode::BadArchive
        }
        Error::NoCsvInArchive | Error::FileMissing | Error::ParsingFailed { .. } => {
            ExitCode::NoTopics
        }
        Error::Io(_) | Error::CopyFailed { .. } => ExitCode::IoError,
        _ => ExitCode::FatalError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let traversal = Error::PathTraversal {
            entry_index: 0,
            path: "../a.csv".into(),
        };
        assert_eq!(error_to_exit_code(&traversal), ExitCode::BadArchive);
        assert_eq!(error_to_exit_code(&Error::NoCsvInArchive), ExitCode::NoTopics);
        assert_eq!(
            error_to_exit_code(&Error::UnsupportedFileType {
                extension: "pdf".into()
            }),
            ExitCode::BadArgs
        );
        assert_eq!(error_to_exit_code(&Error::StoresUnavailable), ExitCode::FatalError);
    }
}

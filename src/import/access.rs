//! Scoped access to externally granted source files.
//!
//! Some hosts only allow reading a user-picked file between an explicit
//! start and stop call. [`AccessGuard`] pairs the two so the grant is
//! released on every exit path of an import.

use std::path::{Path, PathBuf};

use log::debug;

/// Host hook for starting and stopping access to a source file.
pub trait SourceAccess: Send + Sync {
    /// Requests access to `path`.
    ///
    /// Returns `true` if access was granted and must later be released.
    fn start_access(&self, path: &Path) -> bool;

    /// Releases a grant previously returned by [`start_access`](Self::start_access).
    fn stop_access(&self, path: &Path);
}

/// Access provider for hosts without scoped grants.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnrestrictedAccess;

impl SourceAccess for UnrestrictedAccess {
    fn start_access(&self, _path: &Path) -> bool {
        false
    }

    fn stop_access(&self, _path: &Path) {}
}

/// Holds a grant for the duration of a scope.
#[must_use = "access is released as soon as the guard is dropped"]
pub struct AccessGuard<'a> {
    provider: &'a dyn SourceAccess,
    path: PathBuf,
    held: bool,
}

impl<'a> AccessGuard<'a> {
    /// Starts access to `path` through `provider`.
    pub fn acquire(provider: &'a dyn SourceAccess, path: &Path) -> Self {
        let held = provider.start_access(path);
        if held {
            debug!("acquired scoped access to {}", path.display());
        }
        Self {
            provider,
            path: path.to_path_buf(),
            held,
        }
    }

    /// Returns `true` if the provider granted a scoped grant.
    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        if self.held {
            self.provider.stop_access(&self.path);
            debug!("released scoped access to {}", self.path.display());
        }
    }
}

//! Extraction options and resource limits.

use crate::progress::ProgressReporter;

/// Default limit on the decompressed size of a single entry (64 MiB).
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 64 * 1024 * 1024;

/// Default limit on the decompressed size of a whole archive (256 MiB).
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 256 * 1024 * 1024;

/// Guards against compression bombs.
///
/// Topic files are small text files; anything approaching these limits is
/// either a mistake or hostile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum decompressed size of one entry.
    pub max_entry_size: u64,
    /// Maximum decompressed size of all entries together.
    pub max_total_size: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
        }
    }
}

impl ResourceLimits {
    /// Sets the per-entry limit.
    pub fn max_entry_size(mut self, bytes: u64) -> Self {
        self.max_entry_size = bytes;
        self
    }

    /// Sets the whole-archive limit.
    pub fn max_total_size(mut self, bytes: u64) -> Self {
        self.max_total_size = bytes;
        self
    }
}

/// Options for extraction operations.
pub struct ExtractOptions {
    /// Resource limits for extraction.
    pub limits: ResourceLimits,
    /// Whether to compare each file's CRC-32 with the central directory.
    pub verify_crc: bool,
    /// Progress reporter for tracking extraction progress (optional).
    pub progress: Option<Box<dyn ProgressReporter>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            verify_crc: true,
            progress: None,
        }
    }
}

impl std::fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("limits", &self.limits)
            .field("verify_crc", &self.verify_crc)
            .finish_non_exhaustive()
    }
}

impl ExtractOptions {
    /// Creates extraction options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource limits.
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enables or disables CRC-32 verification.
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Box::new(reporter));
        self
    }
}

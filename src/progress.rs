//! Progress reporting for archive extraction and import.
//!
//! Reporting is observational only: an in-flight extraction has no
//! cancellation hook and always runs to completion or failure.
//!
//! # Example
//!
//! ```rust
//! use vocabvault::progress::{ProgressReporter, StatisticsProgress};
//!
//! let mut progress = StatisticsProgress::new();
//! progress.on_total(2);
//! progress.on_entry_start("a.csv", 120);
//! progress.on_entry_complete("a.csv", true);
//! assert_eq!(progress.entries_processed(), 1);
//! ```

/// IEC byte unit: 1 KiB = 1024 bytes.
pub const BYTES_KIB: u64 = 1024;
/// IEC byte unit: 1 MiB = 1024 KiB.
pub const BYTES_MIB: u64 = 1024 * BYTES_KIB;

/// Progress reporting trait for extraction.
pub trait ProgressReporter: Send {
    /// Called once before extraction begins with the number of entries.
    fn on_total(&mut self, total_entries: usize) {
        let _ = total_entries;
    }

    /// Called when starting to process a new entry.
    ///
    /// Note: Archives contain "entries" which may be files or directories.
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called when entry processing completes.
    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        let _ = (entry_name, success);
    }

    /// Called on any warning during processing.
    fn on_warning(&mut self, message: &str) {
        let _ = message;
    }
}

/// A progress reporter that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A progress reporter that collects counters.
#[derive(Debug, Default, Clone)]
pub struct StatisticsProgress {
    total_entries: usize,
    entries_processed: usize,
    entries_failed: usize,
    bytes_declared: u64,
    warnings: Vec<String>,
}

impl StatisticsProgress {
    /// Creates a new statistics reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries announced by [`ProgressReporter::on_total`].
    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    /// Entries that completed, successfully or not.
    pub fn entries_processed(&self) -> usize {
        self.entries_processed
    }

    /// Entries that completed unsuccessfully.
    pub fn entries_failed(&self) -> usize {
        self.entries_failed
    }

    /// Sum of the declared uncompressed sizes of started entries.
    pub fn bytes_declared(&self) -> u64 {
        self.bytes_declared
    }

    /// Warnings received so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl ProgressReporter for StatisticsProgress {
    fn on_total(&mut self, total_entries: usize) {
        self.total_entries = total_entries;
    }

    fn on_entry_start(&mut self, _entry_name: &str, size: u64) {
        self.bytes_declared = self.bytes_declared.saturating_add(size);
    }

    fn on_entry_complete(&mut self, _entry_name: &str, success: bool) {
        self.entries_processed += 1;
        if !success {
            self.entries_failed += 1;
        }
    }

    fn on_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

/// Formats a byte count with IEC units.
pub fn format_bytes_iec(bytes: u64) -> String {
    if bytes >= BYTES_MIB {
        format!("{:.1} MiB", bytes as f64 / BYTES_MIB as f64)
    } else if bytes >= BYTES_KIB {
        format!("{:.1} KiB", bytes as f64 / BYTES_KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

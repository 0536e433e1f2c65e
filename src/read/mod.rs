//! Archive reading API for ZIP archives.
//!
//! This module provides the public API for reading topic archives: listing
//! central directory records, extracting single entries into memory, and
//! extracting a whole archive into a directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use vocabvault::read::{Archive, ExtractOptions};
//!
//! let archive = Archive::open_path("topics.zip")?;
//! for record in archive.records() {
//!     println!("{}: {} bytes", record.name, record.uncompressed_size);
//! }
//! archive.extract_to("scratch", &mut ExtractOptions::default())?;
//! # Ok::<(), vocabvault::Error>(())
//! ```

mod extraction;
mod options;
mod path_safety;

pub use extraction::extract_entry;
pub use options::{DEFAULT_MAX_ENTRY_SIZE, DEFAULT_MAX_TOTAL_SIZE, ExtractOptions, ResourceLimits};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::format::CentralDirectoryRecord;
use crate::format::parser::parse_central_directory;
use crate::progress::ProgressReporter;
use crate::{Error, Result};

/// One entry pulled out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Entry name relative to the archive root; directories end with `/`.
    pub relative_path: String,
    /// Decompressed contents; always empty for directories.
    pub bytes: Vec<u8>,
}

impl ExtractedEntry {
    pub(crate) fn directory(name: &str) -> Self {
        Self {
            relative_path: name.to_string(),
            bytes: Vec::new(),
        }
    }

    pub(crate) fn file(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            relative_path: name.to_string(),
            bytes,
        }
    }

    /// Returns `true` if this entry only creates a directory.
    pub fn is_directory(&self) -> bool {
        self.relative_path.ends_with('/') || self.relative_path.ends_with('\\')
    }
}

/// Result of extracting an archive into a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractResult {
    /// Files written, in central directory order.
    pub files: Vec<PathBuf>,
    /// Number of directory entries processed.
    pub directories: usize,
    /// Total bytes written.
    pub bytes_written: u64,
}

/// An in-memory ZIP archive with its parsed central directory.
///
/// Constructed per import and discarded afterwards; never mutated.
#[derive(Clone)]
pub struct Archive {
    data: Vec<u8>,
    records: Vec<CentralDirectoryRecord>,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("size", &self.data.len())
            .field("records", &self.records)
            .finish()
    }
}

impl Archive {
    /// Reads and parses an archive file.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }

    /// Parses an archive held in memory.
    ///
    /// The whole central directory and every referenced local header are
    /// validated here; a returned `Archive` is structurally sound.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let records = parse_central_directory(&data)?;
        debug!("parsed {} central directory records", records.len());
        Ok(Self { data, records })
    }

    /// Returns the central directory records.
    pub fn records(&self) -> &[CentralDirectoryRecord] {
        &self.records
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the raw archive bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Finds a record by exact entry name.
    pub fn record_by_name(&self, name: &str) -> Option<&CentralDirectoryRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Extracts the entry at `index` into memory.
    pub fn extract_entry(&self, index: usize, options: &ExtractOptions) -> Result<ExtractedEntry> {
        let record = self.records.get(index).ok_or_else(|| {
            Error::malformed(0, format!("no entry at index {}", index))
        })?;
        extract_entry(&self.data, record, options)
    }

    /// Extracts the entry called `name` into memory.
    pub fn extract_to_vec(&self, name: &str, options: &ExtractOptions) -> Result<Vec<u8>> {
        let record = self
            .record_by_name(name)
            .ok_or_else(|| Error::malformed(0, format!("no entry named '{}'", name)))?;
        Ok(extract_entry(&self.data, record, options)?.bytes)
    }

    /// Extracts every entry below `dest`.
    ///
    /// All entry names are validated before the first byte is written, so a
    /// hostile name aborts the extraction with nothing on disk. Two file
    /// entries resolving to the same path (`a.csv` and `./a.csv`) are
    /// rejected as malformed; repeated directory entries are fine.
    /// Extraction is sequential and stops at the first failing entry.
    pub fn extract_to(
        &self,
        dest: impl AsRef<Path>,
        options: &mut ExtractOptions,
    ) -> Result<ExtractResult> {
        let dest = dest.as_ref();
        let targets = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| path_safety::validate_entry_path(i, &r.name, dest))
            .collect::<Result<Vec<_>>>()?;
        self.check_unique_targets(&targets)?;

        let mut progress = options.progress.take();
        let outcome = self.extract_targets(&targets, options, &mut progress);
        options.progress = progress;
        outcome
    }

    fn check_unique_targets(&self, targets: &[PathBuf]) -> Result<()> {
        let mut seen: HashMap<&Path, bool> = HashMap::with_capacity(targets.len());
        for (record, target) in self.records.iter().zip(targets) {
            let is_dir = record.is_directory();
            if let Some(&earlier_is_dir) = seen.get(target.as_path()) {
                if earlier_is_dir && is_dir {
                    continue;
                }
                return Err(Error::malformed(
                    record.local_header_offset as usize,
                    format!("entry '{}' duplicates an earlier entry path", record.name),
                ));
            }
            seen.insert(target.as_path(), is_dir);
        }
        Ok(())
    }

    fn extract_targets(
        &self,
        targets: &[PathBuf],
        options: &ExtractOptions,
        progress: &mut Option<Box<dyn ProgressReporter>>,
    ) -> Result<ExtractResult> {
        if let Some(p) = progress.as_mut() {
            p.on_total(self.records.len());
        }

        let mut result = ExtractResult::default();
        for (record, target) in self.records.iter().zip(targets) {
            if let Some(p) = progress.as_mut() {
                p.on_entry_start(&record.name, u64::from(record.uncompressed_size));
            }

            let written = extract_entry(&self.data, record, options).and_then(|entry| {
                let size = entry.bytes.len() as u64;
                if result.bytes_written.saturating_add(size) > options.limits.max_total_size {
                    return Err(Error::ResourceLimitExceeded(format!(
                        "archive expands beyond the {} byte limit",
                        options.limits.max_total_size
                    )));
                }
                let path = extraction::write_entry(&entry, target)?;
                Ok((path, size))
            });

            if let Some(p) = progress.as_mut() {
                if let Ok((_, size)) = &written {
                    if *size != u64::from(record.uncompressed_size) {
                        p.on_warning(&format!(
                            "'{}' declares {} bytes but holds {}",
                            record.name, record.uncompressed_size, size
                        ));
                    }
                }
                p.on_entry_complete(&record.name, written.is_ok());
            }

            match written? {
                (Some(path), size) => {
                    result.files.push(path);
                    result.bytes_written += size;
                }
                (None, _) => result.directories += 1,
            }
        }
        Ok(result)
    }
}

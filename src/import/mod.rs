//! Topic import pipeline.
//!
//! An import takes one user-picked file and copies every topic it holds into
//! the managed storage directory:
//!
//! - `.csv` files are copied directly under a sanitized, unique name.
//! - `.zip` archives are parsed and fully validated, extracted into a
//!   scratch directory, and each `.csv` found inside is copied the same way.
//!
//! # Example
//!
//! ```rust,no_run
//! use vocabvault::import::ImportPipeline;
//!
//! let pipeline = ImportPipeline::new("./topics");
//! let result = pipeline.import_topics("downloads/topics.zip")?;
//! println!("imported {} topics: {:?}", result.count(), result.filenames);
//! # Ok::<(), vocabvault::Error>(())
//! ```

mod access;
mod naming;

pub use access::{AccessGuard, SourceAccess, UnrestrictedAccess};
pub use naming::{TOPIC_EXTENSION, sanitize_file_name, unique_destination};

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info, warn};
use tempfile::{NamedTempFile, TempDir};
use walkdir::WalkDir;

use crate::format::detect::{SourceKind, detect_source_kind, is_csv_path};
use crate::read::{Archive, ExtractOptions, ResourceLimits};
use crate::{Error, Result};

/// Settings for an [`ImportPipeline`].
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Size limits applied while extracting archives.
    pub limits: ResourceLimits,
    /// Whether CRC-32 checksums of archive entries are verified.
    pub verify_crc: bool,
    /// Parent directory for scratch extraction; the system temp dir if `None`.
    pub scratch_root: Option<PathBuf>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            verify_crc: true,
            scratch_root: None,
        }
    }
}

impl ImportOptions {
    /// Creates options with default limits and CRC verification on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum decompressed size of a single entry.
    pub fn max_entry_size(mut self, bytes: u64) -> Self {
        self.limits = self.limits.max_entry_size(bytes);
        self
    }

    /// Sets the maximum decompressed size of a whole archive.
    pub fn max_total_size(mut self, bytes: u64) -> Self {
        self.limits = self.limits.max_total_size(bytes);
        self
    }

    /// Enables or disables CRC-32 verification.
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Places scratch directories below `root`.
    pub fn scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .limits(self.limits)
            .verify_crc(self.verify_crc)
    }
}

/// Destination file names written by one import, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    /// File names (not paths) inside the storage directory.
    pub filenames: Vec<String>,
}

impl ImportResult {
    /// Number of topic files written.
    pub fn count(&self) -> usize {
        self.filenames.len()
    }
}

/// Imports topic files into a managed storage directory.
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    storage_dir: PathBuf,
    options: ImportOptions,
}

impl ImportPipeline {
    /// Creates a pipeline writing into `storage_dir` with default options.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(storage_dir, ImportOptions::default())
    }

    /// Creates a pipeline with explicit options.
    pub fn with_options(storage_dir: impl Into<PathBuf>, options: ImportOptions) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            options,
        }
    }

    /// Returns the managed storage directory.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Returns the pipeline options.
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Imports `source`, a `.csv` or `.zip` file.
    ///
    /// On error nothing written by this call remains in the storage
    /// directory.
    pub fn import_topics(&self, source: impl AsRef<Path>) -> Result<ImportResult> {
        self.import_topics_with_access(source, &UnrestrictedAccess)
    }

    /// Imports `source` while holding a scoped grant from `access`.
    ///
    /// The grant is released before returning, whether the import succeeded
    /// or not.
    pub fn import_topics_with_access(
        &self,
        source: impl AsRef<Path>,
        access: &dyn SourceAccess,
    ) -> Result<ImportResult> {
        let source = source.as_ref();
        let kind = detect_source_kind(source)?;
        let _guard = AccessGuard::acquire(access, source);

        debug!("importing {} as {}", source.display(), kind);
        let result = match kind {
            SourceKind::Csv => self.import_csv(source)?,
            SourceKind::Zip => self.import_archive(source)?,
        };
        info!(
            "imported {} topic file(s) from {}",
            result.count(),
            source.display()
        );
        Ok(result)
    }

    /// Runs [`import_topics`](Self::import_topics) on a worker thread.
    ///
    /// The import cannot be cancelled once started.
    pub fn spawn_import(
        self: &Arc<Self>,
        source: impl Into<PathBuf>,
    ) -> Result<JoinHandle<Result<ImportResult>>> {
        let pipeline = Arc::clone(self);
        let source = source.into();
        let handle = std::thread::Builder::new()
            .name("topic-import".into())
            .spawn(move || pipeline.import_topics(&source))?;
        Ok(handle)
    }

    fn import_csv(&self, source: &Path) -> Result<ImportResult> {
        self.ensure_storage()?;
        let name = file_name_of(source);
        let dest = store_file(source, &self.storage_dir, &sanitize_file_name(&name))?;
        Ok(ImportResult {
            filenames: vec![file_name_of(&dest)],
        })
    }

    fn import_archive(&self, source: &Path) -> Result<ImportResult> {
        let archive = Archive::open_path(source)?;
        let scratch = self.scratch_dir()?;

        let mut extract_options = self.options.extract_options();
        let extracted = archive.extract_to(scratch.path(), &mut extract_options)?;
        debug!(
            "extracted {} files ({} bytes) to {}",
            extracted.files.len(),
            extracted.bytes_written,
            scratch.path().display()
        );

        let csv_files = collect_csv_files(scratch.path())?;
        if csv_files.is_empty() {
            return Err(Error::NoCsvInArchive);
        }

        self.ensure_storage()?;
        let written = store_all(&csv_files, &self.storage_dir, store_file)?;

        Ok(ImportResult {
            filenames: written.iter().map(|p| file_name_of(p)).collect(),
        })
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".vocabvault-import-");
        let dir = match &self.options.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn ensure_storage(&self) -> Result<()> {
        fs::create_dir_all(&self.storage_dir).map_err(|source| Error::CopyFailed {
            path: self.storage_dir.clone(),
            source,
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists extracted `.csv` files in file-name order.
///
/// macOS resource-fork entries (`__MACOSX/`, `._name.csv`) are not topics.
fn collect_csv_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() || !is_csv_path(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let is_fork = relative.components().any(|c| c.as_os_str() == "__MACOSX")
            || entry.file_name().to_string_lossy().starts_with("._");
        if is_fork {
            debug!("skipping resource fork {}", relative.display());
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

/// Copies `source` into `dir` under a free variant of `file_name`.
///
/// The data goes to a temporary file first and is then linked in without
/// replacing anything. If another writer claims the chosen name in the
/// meantime, the next free name is picked and the same temporary file is
/// linked again. Returns the final path.
fn store_file(source: &Path, dir: &Path, file_name: &str) -> Result<PathBuf> {
    let copy_failed = |path: PathBuf| move |source: io::Error| Error::CopyFailed { path, source };
    let target = dir.join(file_name);

    let mut input = File::open(source).map_err(copy_failed(target.clone()))?;
    let mut temp = NamedTempFile::new_in(dir).map_err(copy_failed(target.clone()))?;
    io::copy(&mut input, temp.as_file_mut()).map_err(copy_failed(target.clone()))?;
    temp.as_file().sync_all().map_err(copy_failed(target))?;

    loop {
        let dest = unique_destination(dir, file_name);
        match temp.persist_noclobber(&dest) {
            Ok(_) => {
                debug!("stored {}", dest.display());
                return Ok(dest);
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} was taken concurrently, picking another name", dest.display());
                temp = e.file;
            }
            Err(e) => return Err(copy_failed(dest)(e.error)),
        }
    }
}

/// Stores every file in order, removing the ones already written if any
/// store fails.
fn store_all<F>(files: &[PathBuf], dir: &Path, mut store: F) -> Result<Vec<PathBuf>>
where
    F: FnMut(&Path, &Path, &str) -> Result<PathBuf>,
{
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        match store(file, dir, &sanitize_file_name(&file_name_of(file))) {
            Ok(dest) => written.push(dest),
            Err(e) => {
                roll_back(&written);
                return Err(e);
            }
        }
    }
    Ok(written)
}

fn roll_back(written: &[PathBuf]) {
    for path in written {
        if let Err(e) = fs::remove_file(path) {
            warn!("failed to roll back {}: {}", path.display(), e);
        }
    }
}

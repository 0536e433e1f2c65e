//! Command implementations for the CLI tool.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dialoguer::Confirm;
use vocabvault::import::{ImportOptions, ImportPipeline};
use vocabvault::progress::ProgressReporter;
use vocabvault::read::{Archive, ExtractOptions};
use vocabvault::snapshot::{self, SnapshotManager};
use vocabvault::state::{DirectoryBackend, PracticeStore, ProgressStore, StudyConfig};
use vocabvault::topic::load_library;
use vocabvault::{Result, VocabularyTopic};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{ImportSummary, TestSummary, TopicRow, create_formatter};
use crate::progress::{CliProgress, Spinner};

/// Storage locations shared by the library commands.
pub struct Library<'a> {
    pub storage: &'a Path,
    pub bundled: Option<&'a Path>,
    pub state: &'a Path,
}

impl Library<'_> {
    fn load_topics(&self) -> Result<Vec<VocabularyTopic>> {
        load_library(self.bundled, Some(self.storage))
    }

    fn backend(&self) -> DirectoryBackend {
        DirectoryBackend::new(self.state)
    }

    fn load_stores(&self, config: &StudyConfig) -> Result<(PracticeStore, ProgressStore)> {
        let backend = self.backend();
        Ok((
            PracticeStore::load(config, &backend)?,
            ProgressStore::load(config, &backend)?,
        ))
    }
}

/// Configuration for the import command.
pub struct ImportConfig<'a> {
    pub sources: &'a [PathBuf],
    pub storage: &'a Path,
    pub verify_crc: bool,
    pub max_entry_size: Option<u64>,
    pub format: OutputFormat,
    pub quiet: bool,
}

fn report(result: Result<ExitCode>) -> ExitCode {
    result.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        error_to_exit_code(&e)
    })
}

fn emit(text: String) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Import command implementation
pub fn import(config: &ImportConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let mut options = ImportOptions::new().verify_crc(config.verify_crc);
    if let Some(max) = config.max_entry_size {
        options = options.max_entry_size(max);
    }
    let pipeline = Arc::new(ImportPipeline::with_options(config.storage, options));

    let mut summary = ImportSummary::default();
    let mut failure_code = None;
    for source in config.sources {
        let spinner = Spinner::start(&format!("Importing {}", source.display()), config.quiet);
        let outcome = pipeline.spawn_import(source.clone()).and_then(|handle| {
            handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("import worker panicked").into()))
        });
        spinner.finish();

        let label = source.display().to_string();
        match outcome {
            Ok(result) => summary.imported.push((label, result.filenames)),
            Err(e) => {
                failure_code = Some(error_to_exit_code(&e));
                summary.failures.push((label, e.to_string()));
            }
        }
    }

    emit(formatter.format_import(&summary));
    match failure_code {
        None => ExitCode::Success,
        Some(code) if summary.imported.is_empty() => code,
        Some(_) => ExitCode::Warning,
    }
}

/// Inspect command implementation
pub fn inspect(archive_path: &Path, test: bool, format: OutputFormat, quiet: bool) -> ExitCode {
    let formatter = create_formatter(format);

    let archive = match Archive::open_path(archive_path) {
        Ok(a) => a,
        Err(e) => return report(Err(e)),
    };

    if !test {
        emit(formatter.format_records(archive.records()));
        return ExitCode::Success;
    }

    let options = ExtractOptions::default();
    let mut progress = CliProgress::new(quiet);
    progress.on_total(archive.len());

    let mut summary = TestSummary::default();
    for (index, record) in archive.records().iter().enumerate() {
        progress.on_entry_start(&record.name, u64::from(record.uncompressed_size));
        let result = archive.extract_entry(index, &options);
        progress.on_entry_complete(&record.name, result.is_ok());

        summary.tested += 1;
        match result {
            Ok(_) => summary.passed += 1,
            Err(e) => summary.failures.push((record.name.clone(), e.to_string())),
        }
    }

    if summary.failures.is_empty() {
        progress.finish();
    } else {
        progress.finish_with_message("Failed");
    }
    emit(formatter.format_test(&summary));

    if summary.failures.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::BadArchive
    }
}

/// Topics command implementation
pub fn topics(library: &Library<'_>, format: OutputFormat) -> ExitCode {
    report(run_topics(library, format))
}

fn run_topics(library: &Library<'_>, format: OutputFormat) -> Result<ExitCode> {
    let formatter = create_formatter(format);
    let topics = library.load_topics()?;
    let (practice, mut progress) = library.load_stores(&StudyConfig::default())?;
    let active = practice.active_ids();

    let rows: Vec<TopicRow> = topics
        .iter()
        .map(|topic| {
            let state = progress.progress_for(topic);
            TopicRow {
                id: topic.id.clone(),
                name: topic.name.clone(),
                user: topic.is_user(),
                entries: topic.entries.len(),
                completed: state.completed_entry_ids.len(),
                completion_count: state.completion_count,
                active: topic
                    .entries
                    .iter()
                    .filter(|e| active.contains(e.id.as_str()))
                    .count(),
            }
        })
        .collect();

    // Reading normalizes stale progress; keep the reduced state.
    progress.save(&library.backend())?;
    emit(formatter.format_topics(&rows));
    Ok(ExitCode::Success)
}

type BoundStores = (
    SnapshotManager,
    Arc<Mutex<PracticeStore>>,
    Arc<Mutex<ProgressStore>>,
);

fn bound_manager(library: &Library<'_>) -> Result<BoundStores> {
    let (practice, progress) = library.load_stores(&StudyConfig::default())?;
    let practice = Arc::new(Mutex::new(practice));
    let progress = Arc::new(Mutex::new(progress));
    let mut manager = SnapshotManager::new();
    manager.bind(Arc::clone(&practice), Arc::clone(&progress));
    Ok((manager, practice, progress))
}

/// Export command implementation
pub fn export(library: &Library<'_>, output: &Path, file_name: &str, format: OutputFormat) -> ExitCode {
    report(run_export(library, output, file_name, format))
}

fn run_export(
    library: &Library<'_>,
    output: &Path,
    file_name: &str,
    format: OutputFormat,
) -> Result<ExitCode> {
    let formatter = create_formatter(format);
    let topics = library.load_topics()?;
    let (manager, _, progress) = bound_manager(library)?;
    lock(&progress).normalize_all(&topics);

    let snapshot = manager.export(&topics)?;
    let path = snapshot::write_snapshot(&snapshot, output, file_name)?;
    emit(formatter.format_export(&path, &snapshot));
    Ok(ExitCode::Success)
}

/// Restore command implementation
pub fn restore(library: &Library<'_>, snapshot_path: &Path, yes: bool, format: OutputFormat) -> ExitCode {
    report(run_restore(library, snapshot_path, yes, format))
}

fn run_restore(
    library: &Library<'_>,
    snapshot_path: &Path,
    yes: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    let formatter = create_formatter(format);
    let snapshot = snapshot::read_snapshot(snapshot_path)?;

    if !yes && !confirm("Replace current practice and progress state?") {
        eprintln!("Cancelled");
        return Ok(ExitCode::Warning);
    }

    let restored_files = snapshot::restore_user_topics(&snapshot, library.storage)?;
    let topics = library.load_topics()?;
    let (manager, practice, progress) = bound_manager(library)?;
    let state = manager.restore(&snapshot, &topics)?;

    let backend = library.backend();
    lock(&practice).save(&backend)?;
    lock(&progress).save(&backend)?;

    emit(formatter.format_restore(&restored_files, &state));
    Ok(ExitCode::Success)
}

fn confirm(prompt: &str) -> bool {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

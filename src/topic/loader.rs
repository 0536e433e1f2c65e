//! Loading topics from CSV files.
//!
//! A topic file has a header row followed by `source, plural, target` rows.
//! Rows without a source or target term are skipped; a file in which every
//! data row is skipped fails to load.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use super::{TopicOrigin, VocabularyTopic, display_name};
use crate::format::detect::is_csv_path;
use crate::identity::OriginKind;
use crate::{Error, Result};

/// Header written to topic files created by this crate.
pub const CSV_HEADER: [&str; 3] = ["Source", "Plural", "Target"];

/// Parses topic rows from `reader` into a new topic.
///
/// `file_name` is only used for error reporting.
pub fn parse_topic_csv<R: Read>(
    reader: R,
    name: &str,
    origin: TopicOrigin,
    file_name: &str,
) -> Result<VocabularyTopic> {
    let mut topic = VocabularyTopic::new(name, origin);
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut skipped = 0usize;
    for (row, record) in rows.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(io::Error::from(e).into()),
            Err(e) => {
                warn!("{}: skipping unreadable row {}: {}", file_name, row + 1, e);
                skipped += 1;
                continue;
            }
        };

        let source = record.get(0).unwrap_or_default();
        let target = record.get(2).unwrap_or_default();
        if source.is_empty() || target.is_empty() {
            warn!("{}: skipping row {} without both terms", file_name, row + 1);
            skipped += 1;
            continue;
        }
        let plural = record
            .get(1)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        topic.push_entry(row, source, plural, target);
    }

    if topic.entries.is_empty() && skipped > 0 {
        return Err(Error::ParsingFailed {
            file_name: file_name.to_string(),
        });
    }
    debug!(
        "loaded topic '{}' with {} entries ({} rows skipped)",
        topic.name,
        topic.entries.len(),
        skipped
    );
    Ok(topic)
}

/// Loads one topic file.
pub fn load_topic_file(path: &Path, origin: OriginKind) -> Result<VocabularyTopic> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let origin = match origin {
        OriginKind::Bundle => TopicOrigin::Bundled,
        OriginKind::User => TopicOrigin::UserImported {
            path: path.to_path_buf(),
        },
    };
    let file = File::open(path)?;
    parse_topic_csv(file, &display_name(path), origin, &file_name)
}

/// Loads every topic from the bundled and user directories.
///
/// Missing directories count as empty. Topics are sorted by display name.
/// Fails with [`Error::FileMissing`] if neither directory holds a CSV file.
pub fn load_library(bundled_dir: Option<&Path>, user_dir: Option<&Path>) -> Result<Vec<VocabularyTopic>> {
    let mut sources = Vec::new();
    if let Some(dir) = bundled_dir {
        sources.extend(list_topic_files(dir)?.into_iter().map(|p| (p, OriginKind::Bundle)));
    }
    if let Some(dir) = user_dir {
        sources.extend(list_topic_files(dir)?.into_iter().map(|p| (p, OriginKind::User)));
    }
    if sources.is_empty() {
        return Err(Error::FileMissing);
    }

    let mut topics = sources
        .iter()
        .map(|(path, origin)| load_topic_file(path, *origin))
        .collect::<Result<Vec<_>>>()?;
    topics.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(topics)
}

fn list_topic_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type()?.is_file() && is_csv_path(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Writes rows as a topic file at `path`, replacing any existing file.
///
/// The file is written to a temporary name first and renamed into place.
pub fn write_topic_file<'a, I>(path: &Path, rows: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>, &'a str)>,
{
    let copy_failed = |source: io::Error| Error::CopyFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(copy_failed)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| copy_failed(e.into()))?;
        for (source, plural, target) in rows {
            writer
                .write_record([source, plural.unwrap_or_default(), target])
                .map_err(|e| copy_failed(e.into()))?;
        }
        writer.flush().map_err(copy_failed)?;
    }
    temp.persist(path).map_err(|e| copy_failed(e.error))?;
    Ok(())
}

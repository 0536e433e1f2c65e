//! Entry extraction: local header validation, payload slicing, and
//! decompression, plus writing extracted entries to a directory.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::codec;
use crate::format::CentralDirectoryRecord;
use crate::format::parser::read_local_header;
use crate::format::reader::ByteReader;
use crate::{Error, Result};

use super::ExtractedEntry;
use super::options::ExtractOptions;

/// Extracts one entry from the archive buffer.
///
/// Directory entries produce an [`ExtractedEntry`] without bytes. File entries
/// have their local header re-validated, their payload sliced out of `data`,
/// and decoded according to the compression method.
pub fn extract_entry(
    data: &[u8],
    record: &CentralDirectoryRecord,
    options: &ExtractOptions,
) -> Result<ExtractedEntry> {
    if record.is_directory() {
        return Ok(ExtractedEntry::directory(&record.name));
    }

    let local = read_local_header(data, record)?;
    let payload = ByteReader::new(data).slice(local.data_offset, record.compressed_size as usize)?;
    debug!(
        "extracting '{}' ({}, {} -> {} bytes) from {:#x}",
        record.name, record.method, record.compressed_size, record.uncompressed_size, local.data_offset
    );

    let bytes = codec::decompress(record, payload, options.limits.max_entry_size)?;

    if options.verify_crc {
        let actual = crc32fast::hash(&bytes);
        if actual != record.crc32 {
            return Err(Error::CrcMismatch {
                entry: record.name.clone(),
                expected: record.crc32,
                actual,
            });
        }
    }

    Ok(ExtractedEntry::file(&record.name, bytes))
}

/// Writes an extracted entry below `dest`.
///
/// `target` must come from path validation. Directories are created; files
/// have their parent directories created and are written in full. Returns the
/// path of the written file, or `None` for a directory.
pub(crate) fn write_entry(entry: &ExtractedEntry, target: &Path) -> Result<Option<PathBuf>> {
    if entry.is_directory() {
        fs::create_dir_all(target)?;
        return Ok(None);
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, &entry.bytes)?;
    Ok(Some(target.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CompressionMethod;

    fn record(name: &str) -> CentralDirectoryRecord {
        CentralDirectoryRecord {
            name: name.into(),
            method: CompressionMethod::Stored,
            flags: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            local_header_offset: 0,
        }
    }

    #[test]
    fn test_directory_entry_has_no_bytes() {
        let entry = extract_entry(&[], &record("words/"), &ExtractOptions::default()).unwrap();
        assert!(entry.is_directory());
        assert!(entry.bytes.is_empty());
    }

    #[test]
    fn test_file_entry_without_local_header_fails() {
        let err = extract_entry(&[0u8; 8], &record("a.csv"), &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedArchive { .. }));
    }

    #[test]
    fn test_write_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file = ExtractedEntry::file("nested/a.csv", b"x,,y\n".to_vec());
        let written = write_entry(&file, &dir.path().join("nested/a.csv"))
            .unwrap()
            .unwrap();
        assert_eq!(fs::read(written).unwrap(), b"x,,y\n");

        let directory = ExtractedEntry::directory("empty/");
        assert!(write_entry(&directory, &dir.path().join("empty")).unwrap().is_none());
        assert!(dir.path().join("empty").is_dir());
    }
}

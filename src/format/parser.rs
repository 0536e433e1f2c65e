//! Central directory parser for ZIP archives.
//!
//! Parsing is driven by the end-of-central-directory (EOCD) record rather than
//! by scanning local headers front to back: local-header scanning cannot tell
//! where a streamed entry ends and is fooled by signatures inside payloads.
//! Every record, and the local header it points at, is validated before any
//! entry is returned, so a corrupt archive is rejected as a whole.

use log::debug;

use crate::{Error, Result};

use super::reader::ByteReader;
use super::{
    CENTRAL_HEADER_SIGNATURE, CENTRAL_HEADER_SIZE, CentralDirectoryRecord, CompressionMethod,
    EOCD_SIGNATURE, EOCD_SIZE, LOCAL_HEADER_SIGNATURE, LOCAL_HEADER_SIZE, LocalHeader,
    MAX_COMMENT_SIZE, ZIP64_MARKER_U16, ZIP64_MARKER_U32, flags,
};

/// The fixed-format record that locates the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Offset of the EOCD signature.
    pub offset: usize,
    /// Total number of central directory records.
    pub total_entries: u16,
    /// Size of the central directory in bytes.
    pub central_directory_size: u32,
    /// Offset of the first central directory record.
    pub central_directory_offset: u32,
    /// Length of the trailing archive comment.
    pub comment_len: u16,
}

/// Locates the EOCD record by scanning backward from the end of the buffer.
///
/// The record is at least [`EOCD_SIZE`] bytes and may be followed by a comment
/// of at most [`MAX_COMMENT_SIZE`] bytes, so only the final 65 557 bytes are
/// searched. A candidate counts only if its comment length reaches exactly to
/// the end of the buffer, so a signature quoted inside a comment is skipped.
pub fn find_end_of_central_directory(data: &[u8]) -> Result<EndOfCentralDirectory> {
    let reader = ByteReader::new(data);
    if data.len() < EOCD_SIZE {
        return Err(Error::malformed(
            0,
            format!(
                "{} bytes is too short for an end of central directory record",
                data.len()
            ),
        ));
    }

    let start = data.len() - EOCD_SIZE;
    let stop = data.len().saturating_sub(EOCD_SIZE + MAX_COMMENT_SIZE);

    let offset = (stop..=start)
        .rev()
        .find(|&pos| {
            reader.has_signature(pos, EOCD_SIGNATURE)
                && matches!(
                    reader.u16_at(pos + 20),
                    Ok(comment_len) if pos + EOCD_SIZE + comment_len as usize == data.len()
                )
        })
        .ok_or_else(|| {
            Error::malformed(stop, "end of central directory signature not found")
        })?;

    let eocd = EndOfCentralDirectory {
        offset,
        total_entries: reader.u16_at(offset + 10)?,
        central_directory_size: reader.u32_at(offset + 12)?,
        central_directory_offset: reader.u32_at(offset + 16)?,
        comment_len: reader.u16_at(offset + 20)?,
    };
    debug!(
        "EOCD at {:#x}: {} entries, central directory {} bytes at {:#x}",
        eocd.offset,
        eocd.total_entries,
        eocd.central_directory_size,
        eocd.central_directory_offset
    );
    Ok(eocd)
}

/// Parses the central directory of an in-memory archive.
///
/// Returns one record per entry in central directory order. Fails with
/// [`Error::MalformedArchive`] on any structural inconsistency, including an
/// entry written with a data descriptor (general purpose flag bit 3), and
/// with [`Error::UnsupportedFeature`] for ZIP64 or encrypted archives.
pub fn parse_central_directory(data: &[u8]) -> Result<Vec<CentralDirectoryRecord>> {
    let reader = ByteReader::new(data);
    let eocd = find_end_of_central_directory(data)?;

    if eocd.total_entries == ZIP64_MARKER_U16
        || eocd.central_directory_offset == ZIP64_MARKER_U32
        || eocd.central_directory_size == ZIP64_MARKER_U32
    {
        return Err(Error::UnsupportedFeature {
            feature: "ZIP64 archives",
        });
    }

    let cd_start = eocd.central_directory_offset as usize;
    let cd_end = cd_start
        .checked_add(eocd.central_directory_size as usize)
        .filter(|&end| end <= eocd.offset)
        .ok_or_else(|| {
            Error::malformed(
                eocd.offset,
                format!(
                    "central directory ({} bytes at {:#x}) does not end before the end record",
                    eocd.central_directory_size, cd_start
                ),
            )
        })?;

    let mut records = Vec::with_capacity(eocd.total_entries as usize);
    let mut pos = cd_start;
    while pos < cd_end && reader.has_signature(pos, CENTRAL_HEADER_SIGNATURE) {
        let (record, next) = read_central_record(&reader, pos)?;
        validate_record(&reader, &record, pos)?;
        records.push(record);
        pos = next;
    }

    if records.len() != eocd.total_entries as usize {
        return Err(Error::malformed(
            pos,
            format!(
                "central directory holds {} records but the end record declares {}",
                records.len(),
                eocd.total_entries
            ),
        ));
    }

    Ok(records)
}

/// Reads the central directory record at `pos`, returning it with the offset
/// of the next record.
fn read_central_record(
    reader: &ByteReader<'_>,
    pos: usize,
) -> Result<(CentralDirectoryRecord, usize)> {
    let flags = reader.u16_at(pos + 8)?;
    let method = CompressionMethod::from_raw(reader.u16_at(pos + 10)?);
    let crc32 = reader.u32_at(pos + 16)?;
    let compressed_size = reader.u32_at(pos + 20)?;
    let uncompressed_size = reader.u32_at(pos + 24)?;
    let name_len = reader.u16_at(pos + 28)? as usize;
    let extra_len = reader.u16_at(pos + 30)? as usize;
    let comment_len = reader.u16_at(pos + 32)? as usize;
    let local_header_offset = reader.u32_at(pos + 42)?;

    let name_bytes = reader.slice(pos + CENTRAL_HEADER_SIZE, name_len)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();

    let next = pos + CENTRAL_HEADER_SIZE + name_len + extra_len + comment_len;
    // The variable-length tail must also be inside the buffer.
    reader.slice(pos, next - pos)?;

    Ok((
        CentralDirectoryRecord {
            name,
            method,
            flags,
            crc32,
            compressed_size,
            uncompressed_size,
            local_header_offset,
        },
        next,
    ))
}

fn validate_record(
    reader: &ByteReader<'_>,
    record: &CentralDirectoryRecord,
    pos: usize,
) -> Result<()> {
    if record.has_data_descriptor() {
        return Err(Error::malformed(
            pos,
            format!(
                "entry '{}' uses a data descriptor (streamed entries are not supported)",
                record.name
            ),
        ));
    }
    if record.is_encrypted() {
        return Err(Error::UnsupportedFeature {
            feature: "encrypted entries",
        });
    }
    if record.compressed_size == ZIP64_MARKER_U32
        || record.uncompressed_size == ZIP64_MARKER_U32
        || record.local_header_offset == ZIP64_MARKER_U32
    {
        return Err(Error::UnsupportedFeature {
            feature: "ZIP64 entries",
        });
    }

    read_local_header(reader.data(), record)?;
    Ok(())
}

/// Validates the local header referenced by `record` and locates its payload.
///
/// Checks the local header signature, that the local header agrees on the
/// streaming flag, and that the full compressed payload lies inside `data`.
pub fn read_local_header(data: &[u8], record: &CentralDirectoryRecord) -> Result<LocalHeader> {
    let reader = ByteReader::new(data);
    let offset = record.local_header_offset as usize;

    if !reader.has_signature(offset, LOCAL_HEADER_SIGNATURE) {
        return Err(Error::malformed(
            offset,
            format!("bad local header signature for entry '{}'", record.name),
        ));
    }

    let local_flags = reader.u16_at(offset + 6)?;
    if local_flags & flags::DATA_DESCRIPTOR != 0 {
        return Err(Error::malformed(
            offset,
            format!(
                "entry '{}' uses a data descriptor (streamed entries are not supported)",
                record.name
            ),
        ));
    }

    let name_len = reader.u16_at(offset + 26)? as usize;
    let extra_len = reader.u16_at(offset + 28)? as usize;
    let data_offset = offset + LOCAL_HEADER_SIZE + name_len + extra_len;
    reader.slice(data_offset, record.compressed_size as usize)?;

    Ok(LocalHeader {
        offset,
        flags: local_flags,
        data_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a single stored entry archive by hand.
    fn stored_archive(name: &str, payload: &[u8], flag_bits: u16) -> Vec<u8> {
        let crc = crc32fast::hash(payload);
        let mut out = Vec::new();

        out.extend_from_slice(&LOCAL_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flag_bits.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(payload);

        let cd_offset = out.len();
        out.extend_from_slice(&CENTRAL_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flag_bits.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0; 12]);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        let cd_size = out.len() - cd_offset;

        out.extend_from_slice(&EOCD_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&(cd_size as u32).to_le_bytes());
        out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn test_parse_single_entry() {
        let data = stored_archive("a.csv", b"x,,y\n", 0);
        let records = parse_central_directory(&data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "a.csv");
        assert_eq!(records[0].method, CompressionMethod::Stored);
        assert_eq!(records[0].compressed_size, 5);
        assert_eq!(records[0].local_header_offset, 0);

        let local = read_local_header(&data, &records[0]).unwrap();
        assert_eq!(local.data_offset, LOCAL_HEADER_SIZE + "a.csv".len());
    }

    #[test]
    fn test_eocd_found_behind_comment() {
        let mut data = stored_archive("a.csv", b"abc", 0);
        let comment = vec![b'z'; 300];
        let len = data.len();
        data[len - 2..].copy_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(&comment);

        let eocd = find_end_of_central_directory(&data).unwrap();
        assert_eq!(eocd.comment_len, 300);
        assert_eq!(parse_central_directory(&data).unwrap().len(), 1);
    }

    #[test]
    fn test_eocd_outside_search_window() {
        let mut data = stored_archive("a.csv", b"abc", 0);
        data.extend(std::iter::repeat_n(0u8, MAX_COMMENT_SIZE + 1));
        assert!(matches!(
            find_end_of_central_directory(&data),
            Err(Error::MalformedArchive { .. })
        ));
    }

    #[test]
    fn test_too_short_input() {
        assert!(matches!(
            parse_central_directory(&[0x50, 0x4b, 0x05, 0x06]),
            Err(Error::MalformedArchive { .. })
        ));
        assert!(parse_central_directory(&[]).is_err());
    }

    #[test]
    fn test_data_descriptor_rejected() {
        let data = stored_archive("a.csv", b"abc", flags::DATA_DESCRIPTOR);
        assert!(matches!(
            parse_central_directory(&data),
            Err(Error::MalformedArchive { .. })
        ));
    }

    #[test]
    fn test_encrypted_rejected() {
        let data = stored_archive("a.csv", b"abc", flags::ENCRYPTED);
        assert!(matches!(
            parse_central_directory(&data),
            Err(Error::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn test_central_directory_offset_past_end() {
        let mut data = stored_archive("a.csv", b"abc", 0);
        let len = data.len();
        data[len - 6..len - 2].copy_from_slice(&0x00ff_ffffu32.to_le_bytes());
        assert!(matches!(
            parse_central_directory(&data),
            Err(Error::MalformedArchive { .. })
        ));
    }

    #[test]
    fn test_local_header_offset_past_end() {
        let mut data = stored_archive("a.csv", b"abc", 0);
        let cd_offset = LOCAL_HEADER_SIZE + "a.csv".len() + 3;
        data[cd_offset + 42..cd_offset + 46].copy_from_slice(&0x0010_0000u32.to_le_bytes());
        assert!(matches!(
            parse_central_directory(&data),
            Err(Error::MalformedArchive { .. })
        ));
    }

    #[test]
    fn test_entry_count_mismatch() {
        let mut data = stored_archive("a.csv", b"abc", 0);
        let len = data.len();
        // total entries field
        data[len - 12..len - 10].copy_from_slice(&2u16.to_le_bytes());
        assert!(matches!(
            parse_central_directory(&data),
            Err(Error::MalformedArchive { .. })
        ));
    }
}

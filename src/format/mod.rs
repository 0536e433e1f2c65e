//! ZIP container constants, record definitions, and low-level parsing utilities.
//!
//! Only the subset of the PKZIP application note needed to pull `.csv` topic
//! files out of an archive is modelled: the end-of-central-directory record,
//! central directory file headers, and local file headers. ZIP64, encryption,
//! and streaming (data descriptor) entries are recognised so they can be
//! rejected, never decoded.

pub mod detect;
pub mod parser;
pub mod reader;

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory file header signature (`PK\x01\x02`).
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory signature (`PK\x05\x06`).
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;

/// Size of the fixed part of the end-of-central-directory record.
pub const EOCD_SIZE: usize = 22;

/// Maximum length of the archive comment that may trail the EOCD record.
pub const MAX_COMMENT_SIZE: usize = u16::MAX as usize;

/// Size of the fixed part of a central directory file header.
pub const CENTRAL_HEADER_SIZE: usize = 46;

/// Size of the fixed part of a local file header.
pub const LOCAL_HEADER_SIZE: usize = 30;

/// Marker value used by ZIP64 archives in 32-bit size and offset fields.
pub const ZIP64_MARKER_U32: u32 = u32::MAX;

/// Marker value used by ZIP64 archives in 16-bit count fields.
pub const ZIP64_MARKER_U16: u16 = u16::MAX;

/// General purpose bit flags.
pub mod flags {
    /// Entry is encrypted.
    pub const ENCRYPTED: u16 = 0x0001;
    /// Sizes and CRC follow the data in a data descriptor.
    pub const DATA_DESCRIPTOR: u16 = 0x0008;
    /// File name is UTF-8 encoded.
    pub const UTF8_NAME: u16 = 0x0800;
}

/// Compression method recorded for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// Method 0: the payload is stored verbatim.
    Stored,
    /// Method 8: raw deflate.
    Deflate,
    /// Any other method number.
    Other(u16),
}

impl CompressionMethod {
    /// Method number for stored entries.
    pub const STORED_ID: u16 = 0;
    /// Method number for deflate entries.
    pub const DEFLATE_ID: u16 = 8;

    /// Maps a raw method number from a header.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            Self::STORED_ID => Self::Stored,
            Self::DEFLATE_ID => Self::Deflate,
            other => Self::Other(other),
        }
    }

    /// Returns the raw method number.
    pub fn raw(self) -> u16 {
        match self {
            Self::Stored => Self::STORED_ID,
            Self::Deflate => Self::DEFLATE_ID,
            Self::Other(raw) => raw,
        }
    }

    /// Returns a human-readable name for this method.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Deflate => "deflate",
            Self::Other(_) => "unknown",
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "method {}", raw),
            known => write!(f, "{}", known.name()),
        }
    }
}

/// One entry of the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryRecord {
    /// Entry name as stored in the archive; directories end with `/`.
    pub name: String,
    /// Compression method.
    pub method: CompressionMethod,
    /// General purpose bit flags.
    pub flags: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the payload in the archive.
    pub compressed_size: u32,
    /// Declared size after decompression.
    pub uncompressed_size: u32,
    /// Offset of the matching local file header from the start of the archive.
    pub local_header_offset: u32,
}

impl CentralDirectoryRecord {
    /// Returns `true` if this entry names a directory.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || self.name.ends_with('\\')
    }

    /// Returns `true` if the entry was written in streaming mode.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & flags::DATA_DESCRIPTOR != 0
    }

    /// Returns `true` if the entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.flags & flags::ENCRYPTED != 0
    }
}

/// The parts of a local file header needed to locate an entry's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalHeader {
    /// Offset of the header itself.
    pub offset: usize,
    /// General purpose bit flags as repeated in the local header.
    pub flags: u16,
    /// Offset of the first payload byte.
    pub data_offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(CompressionMethod::from_raw(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_raw(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from_raw(14), CompressionMethod::Other(14));
        assert_eq!(CompressionMethod::Other(14).raw(), 14);
        assert_eq!(CompressionMethod::Deflate.to_string(), "deflate");
        assert_eq!(CompressionMethod::Other(12).to_string(), "method 12");
    }

    #[test]
    fn test_record_flags() {
        let record = CentralDirectoryRecord {
            name: "words/".into(),
            method: CompressionMethod::Stored,
            flags: flags::DATA_DESCRIPTOR,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            local_header_offset: 0,
        };
        assert!(record.is_directory());
        assert!(record.has_data_descriptor());
        assert!(!record.is_encrypted());
    }
}

//! Decompression of archive entry payloads.
//!
//! Two methods are understood: stored (method 0), which is a verbatim copy,
//! and raw deflate (method 8), which is streamed through [`deflate::Inflater`].
//! Everything else fails with [`Error::UnsupportedCompression`].

#[cfg(feature = "deflate")]
pub mod deflate;

use log::debug;

use crate::format::{CentralDirectoryRecord, CompressionMethod};
use crate::{Error, Result};

/// Smallest output buffer allocated up front for a decompressed entry (64 KiB).
pub const MIN_OUTPUT_CAPACITY: usize = 64 * 1024;

/// Returns the initial output buffer size for an entry.
///
/// Uses `max(declared_size, 64 KiB)`, clamped to `max_output`. This is only a
/// sizing hint: decoders grow the buffer when the declared size is too small.
pub fn initial_capacity(declared_size: u32, max_output: u64) -> usize {
    let cap = usize::try_from(max_output).unwrap_or(usize::MAX);
    (declared_size as usize).max(MIN_OUTPUT_CAPACITY).min(cap)
}

/// Returns `true` if this build can decode `method`.
pub fn is_supported(method: CompressionMethod) -> bool {
    match method {
        CompressionMethod::Stored => true,
        CompressionMethod::Deflate => cfg!(feature = "deflate"),
        CompressionMethod::Other(_) => false,
    }
}

/// Decodes the compressed payload of `record`.
///
/// `max_output` bounds the number of bytes the entry may expand to; both the
/// declared size and the actual output are checked against it.
pub fn decompress(
    record: &CentralDirectoryRecord,
    payload: &[u8],
    max_output: u64,
) -> Result<Vec<u8>> {
    if u64::from(record.uncompressed_size) > max_output {
        return Err(size_limit_error(&record.name, max_output));
    }

    match record.method {
        CompressionMethod::Stored => {
            if payload.len() as u64 > max_output {
                return Err(size_limit_error(&record.name, max_output));
            }
            if record.compressed_size != record.uncompressed_size {
                debug!(
                    "stored entry '{}' declares {} bytes but holds {}",
                    record.name, record.uncompressed_size, record.compressed_size
                );
            }
            Ok(payload.to_vec())
        }
        #[cfg(feature = "deflate")]
        CompressionMethod::Deflate => deflate::Inflater::new(max_output).inflate(
            &record.name,
            payload,
            record.uncompressed_size,
        ),
        method => Err(Error::UnsupportedCompression {
            entry: record.name.clone(),
            method: method.raw(),
        }),
    }
}

pub(crate) fn size_limit_error(entry: &str, max_output: u64) -> Error {
    Error::ResourceLimitExceeded(format!(
        "entry '{}' expands beyond the {} byte limit",
        entry, max_output
    ))
}

//! Streaming raw-deflate decoder.

use flate2::{Decompress, FlushDecompress, Status};
use log::debug;

use super::{MIN_OUTPUT_CAPACITY, initial_capacity, size_limit_error};
use crate::{Error, Result};

/// Compressed bytes handed to the inflate routine per call.
const INPUT_CHUNK_SIZE: usize = 32 * 1024;

/// Adapter that drives a raw-deflate [`Decompress`] stream over an in-memory
/// payload.
///
/// Input is fed in bounded chunks; the final chunk carries the finish flush.
/// Output accumulates until the stream reports [`Status::StreamEnd`]. The
/// output buffer is grown whenever it fills, so a misreported uncompressed
/// size never truncates the result.
pub struct Inflater {
    stream: Decompress,
    max_output: u64,
}

impl std::fmt::Debug for Inflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inflater")
            .field("max_output", &self.max_output)
            .finish_non_exhaustive()
    }
}

impl Inflater {
    /// Creates a decoder that refuses to produce more than `max_output` bytes.
    pub fn new(max_output: u64) -> Self {
        Self {
            stream: Decompress::new(false),
            max_output,
        }
    }

    /// Inflates `input` completely.
    ///
    /// # Arguments
    ///
    /// * `entry` - Entry name, used in error messages
    /// * `input` - Raw deflate data
    /// * `declared_size` - Uncompressed size from the archive, used for buffer sizing only
    pub fn inflate(mut self, entry: &str, input: &[u8], declared_size: u32) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(initial_capacity(declared_size, self.max_output));

        loop {
            let consumed = (self.stream.total_in() as usize).min(input.len());
            let remaining = &input[consumed..];
            let chunk = &remaining[..remaining.len().min(INPUT_CHUNK_SIZE)];
            let flush = if chunk.len() == remaining.len() {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };

            if output.len() == output.capacity() {
                if output.len() as u64 >= self.max_output {
                    return Err(size_limit_error(entry, self.max_output));
                }
                output.reserve(output.capacity().max(MIN_OUTPUT_CAPACITY));
            }

            let before = (self.stream.total_in(), self.stream.total_out());
            let status = self
                .stream
                .decompress_vec(chunk, &mut output, flush)
                .map_err(|e| Error::DecompressionFailed {
                    entry: entry.to_string(),
                    reason: e.to_string(),
                })?;

            if output.len() as u64 > self.max_output {
                return Err(size_limit_error(entry, self.max_output));
            }

            match status {
                Status::StreamEnd => {
                    if output.len() != declared_size as usize {
                        debug!(
                            "'{}' inflated to {} bytes, archive declared {}",
                            entry,
                            output.len(),
                            declared_size
                        );
                    }
                    return Ok(output);
                }
                Status::Ok | Status::BufError => {
                    if (self.stream.total_in(), self.stream.total_out()) == before {
                        let reason = if remaining.is_empty() {
                            "deflate stream ended before its final block"
                        } else {
                            "inflate made no progress"
                        };
                        return Err(Error::DecompressionFailed {
                            entry: entry.to_string(),
                            reason: reason.to_string(),
                        });
                    }
                }
            }
        }
    }
}

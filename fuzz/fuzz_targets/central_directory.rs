//! Fuzz target for ZIP central directory parsing with arbitrary byte input.
//!
//! Every offset read from the input is attacker controlled, so parsing and
//! in-memory extraction must fail with an error rather than panic or read
//! out of bounds.
//!
//! Run with: cargo +nightly fuzz run central_directory

#![no_main]

use libfuzzer_sys::fuzz_target;
use vocabvault::read::{Archive, ExtractOptions, ResourceLimits};

fuzz_target!(|data: &[u8]| {
    let Ok(archive) = Archive::from_bytes(data.to_vec()) else {
        return;
    };

    // Keep decompression cheap; zip bombs are covered by the limit checks.
    let limits = ResourceLimits::default().max_entry_size(1 << 20);
    let options = ExtractOptions::new().limits(limits);
    for index in 0..archive.len() {
        let _ = archive.extract_entry(index, &options);
    }
});

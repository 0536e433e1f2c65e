//! Fuzz target for topic file name sanitizing.
//!
//! Run with: cargo +nightly fuzz run file_name
//!
//! Properties checked:
//! - Output ends in `.csv`
//! - Output stem is non-empty and only uses `[A-Za-z0-9_-]`
//! - Output never contains a path separator or `..`

#![no_main]

use libfuzzer_sys::fuzz_target;
use vocabvault::import::sanitize_file_name;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };
    let sanitized = sanitize_file_name(name);

    let stem = sanitized
        .strip_suffix(".csv")
        .unwrap_or_else(|| panic!("missing .csv suffix: {:?}", sanitized));
    assert!(!stem.is_empty(), "empty stem for {:?}", name);
    assert!(
        stem.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        "unsafe character in {:?}",
        sanitized
    );
    assert!(!sanitized.contains(".."));
});

//! Shared test utilities for integration tests.
//!
//! Archives are assembled byte by byte so tests control every header field,
//! including ones a well-behaved writer would never produce.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::DeflateEncoder;
use vocabvault::Error;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;

/// One entry of a [`ZipBuilder`] archive.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub method: u16,
    pub flags: u16,
    pub crc32: u32,
    pub payload: Vec<u8>,
    pub uncompressed_size: u32,
}

/// Builds ZIP archives in memory.
///
/// # Example
///
/// ```ignore
/// let bytes = ZipBuilder::new()
///     .stored("a.csv", b"s,p,t\n")
///     .deflated("b.csv", b"s,p,t\n")
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZipBuilder {
    entries: Vec<ZipEntry>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry stored without compression.
    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(ZipEntry {
            name: name.to_string(),
            method: METHOD_STORED,
            flags: 0,
            crc32: crc32fast::hash(data),
            payload: data.to_vec(),
            uncompressed_size: data.len() as u32,
        });
        self
    }

    /// Adds a raw-deflate compressed entry.
    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(ZipEntry {
            name: name.to_string(),
            method: METHOD_DEFLATE,
            flags: 0,
            crc32: crc32fast::hash(data),
            payload: deflate(data),
            uncompressed_size: data.len() as u32,
        });
        self
    }

    /// Adds a directory entry; `name` should end with `/`.
    pub fn directory(self, name: &str) -> Self {
        self.stored(name, b"")
    }

    /// Adds an entry exactly as given.
    pub fn raw(mut self, entry: ZipEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sets the general purpose flags of the last entry.
    pub fn flags(mut self, flags: u16) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.flags = flags;
        }
        self
    }

    /// Overrides the compression method of the last entry.
    pub fn method(mut self, method: u16) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.method = method;
        }
        self
    }

    /// Overrides the CRC-32 of the last entry.
    pub fn crc32(mut self, crc32: u32) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.crc32 = crc32;
        }
        self
    }

    /// Overrides the declared uncompressed size of the last entry.
    pub fn uncompressed_size(mut self, size: u32) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.uncompressed_size = size;
        }
        self
    }

    /// Sets the archive comment.
    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Serializes the archive.
    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    /// Serializes the archive and returns the offsets of interest.
    pub fn build_with_layout(&self) -> (Vec<u8>, Layout) {
        let mut out = Vec::new();
        let mut local_offsets = Vec::new();

        for entry in &self.entries {
            local_offsets.push(out.len());
            put_u32(&mut out, 0x0403_4b50);
            put_u16(&mut out, 20);
            put_u16(&mut out, entry.flags);
            put_u16(&mut out, entry.method);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u32(&mut out, entry.crc32);
            put_u32(&mut out, entry.payload.len() as u32);
            put_u32(&mut out, entry.uncompressed_size);
            put_u16(&mut out, entry.name.len() as u16);
            put_u16(&mut out, 0);
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&entry.payload);
        }

        let central_offset = out.len();
        let mut central_offsets = Vec::new();
        for (entry, &local) in self.entries.iter().zip(&local_offsets) {
            central_offsets.push(out.len());
            put_u32(&mut out, 0x0201_4b50);
            put_u16(&mut out, 20);
            put_u16(&mut out, 20);
            put_u16(&mut out, entry.flags);
            put_u16(&mut out, entry.method);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u32(&mut out, entry.crc32);
            put_u32(&mut out, entry.payload.len() as u32);
            put_u32(&mut out, entry.uncompressed_size);
            put_u16(&mut out, entry.name.len() as u16);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u32(&mut out, 0);
            put_u32(&mut out, local as u32);
            out.extend_from_slice(entry.name.as_bytes());
        }
        let central_size = out.len() - central_offset;

        let eocd_offset = out.len();
        put_u32(&mut out, 0x0605_4b50);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, self.entries.len() as u16);
        put_u16(&mut out, self.entries.len() as u16);
        put_u32(&mut out, central_size as u32);
        put_u32(&mut out, central_offset as u32);
        put_u16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);

        (
            out,
            Layout {
                local_offsets,
                central_offsets,
                eocd_offset,
            },
        )
    }
}

/// Byte offsets of the structures in a built archive.
#[derive(Debug, Clone)]
pub struct Layout {
    pub local_offsets: Vec<usize>,
    pub central_offsets: Vec<usize>,
    pub eocd_offset: usize,
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Overwrites a little-endian `u32` at `offset`.
pub fn patch_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Overwrites a little-endian `u16` at `offset`.
pub fn patch_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Raw-deflate compresses `data`.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("deflate write");
    encoder.finish().expect("deflate finish")
}

/// Unwraps the error of a result that must have failed.
pub fn expect_err<T: std::fmt::Debug>(result: vocabvault::Result<T>) -> Error {
    match result {
        Ok(value) => panic!("expected an error, got {:?}", value),
        Err(e) => e,
    }
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write test file");
    path
}

/// Sorted file names in `dir`.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// A small German topic in CSV form.
pub const FOOD_CSV: &[u8] = b"German,Plural,English\nder Tisch,die Tische,table\ndas Brot,die Brote,bread\n";

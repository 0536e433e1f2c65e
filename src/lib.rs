//! # vocabvault
//!
//! Topic import and study-state engine for a local vocabulary trainer.
//!
//! The crate has two halves:
//!
//! - **Import**: a user-picked `.csv` file, or a `.zip` archive of them, is
//!   validated and copied into a managed topic storage directory. ZIP
//!   archives are read through their central directory, every local header
//!   is checked, and `stored` or `deflate` entries are decompressed in
//!   process.
//! - **State**: practice and progress state is keyed by topic and entry id.
//!   Because ids can be regenerated between reloads, snapshots also carry
//!   content-derived identity keys that let saved state be reattached.
//!
//! ## Quick Start
//!
//! ### Importing Topics
//!
//! ```rust,no_run
//! use vocabvault::{ImportPipeline, Result};
//!
//! fn main() -> Result<()> {
//!     let pipeline = ImportPipeline::new("./topics");
//!     let result = pipeline.import_topics("downloads/german.zip")?;
//!     for name in &result.filenames {
//!         println!("stored {}", name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Practising and Exporting State
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use vocabvault::state::{PracticeStore, StudyConfig};
//! use vocabvault::snapshot::{export, write_snapshot};
//! use vocabvault::topic::load_library;
//!
//! fn main() -> vocabvault::Result<()> {
//!     let topics = load_library(Some("bundled".as_ref()), Some("topics".as_ref()))?;
//!     let mut practice = PracticeStore::new(&StudyConfig::default());
//!     practice.mark_wrong(&topics[0].entries[0].id);
//!
//!     let snapshot = export(&topics, practice.states(), &BTreeMap::new());
//!     write_snapshot(&snapshot, "backup".as_ref(), "vocabvault-snapshot.json")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `deflate` | Yes | Deflate decompression of archive entries |
//! | `cli` | No | Command-line interface tool |
//!
//! Without `deflate`, deflated entries fail with
//! [`Error::UnsupportedCompression`].
//!
//! ## Safety and Resource Limits
//!
//! - **Path traversal protection**: entry names cannot leave the scratch
//!   directory
//! - **Resource limits**: declared and actual entry sizes are capped
//! - **CRC verification**: every extracted entry is checked
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod error;
pub mod format;
pub mod identity;
pub mod import;
pub mod progress;
pub mod read;
pub mod snapshot;
pub mod state;
pub mod topic;

pub use error::{Error, Result};

// Re-export the import API at crate root for convenience
pub use import::{ImportOptions, ImportPipeline, ImportResult};

// Re-export reading API
pub use format::{CentralDirectoryRecord, CompressionMethod};
pub use read::{Archive, ExtractOptions, ExtractResult, ExtractedEntry, ResourceLimits};

// Re-export study state and snapshot API
pub use snapshot::{ReconciledState, Snapshot, SnapshotManager, reconcile};
pub use state::{PracticeCardState, PracticeStore, ProgressStore, StudyConfig, TopicProgressState};
pub use topic::{TopicOrigin, VocabularyEntry, VocabularyTopic};

pub use progress::{NoProgress, ProgressReporter, StatisticsProgress};

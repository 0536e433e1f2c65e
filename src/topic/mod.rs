//! Vocabulary topics and entries.
//!
//! Topic ids are derived from where a topic comes from, never random:
//! bundled topics use `bundle:<lowercased name>` and user topics use
//! `user:<file name>`. Entry ids append the data row index, `<topic id>#<row>`.

mod loader;

pub use loader::{CSV_HEADER, load_library, load_topic_file, parse_topic_csv, write_topic_file};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::identity::{self, OriginKind};

/// Where a topic was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TopicOrigin {
    /// Shipped with the application.
    Bundled,
    /// Imported by the user into topic storage.
    UserImported {
        /// Location of the stored topic file.
        path: PathBuf,
    },
}

impl TopicOrigin {
    /// Returns the identity origin of this topic.
    pub fn kind(&self) -> OriginKind {
        match self {
            Self::Bundled => OriginKind::Bundle,
            Self::UserImported { .. } => OriginKind::User,
        }
    }

    /// Returns `true` for user-imported topics.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::UserImported { .. })
    }
}

/// One vocabulary pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    /// `<topic id>#<row index>`.
    pub id: String,
    /// Word in the language being learned.
    pub source_term: String,
    /// Translation.
    pub target_term: String,
    /// Plural form or free-form note.
    pub plural: Option<String>,
}

/// A named group of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyTopic {
    /// Derived from the origin and name; stable across reloads of one file.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Entries in file order.
    pub entries: Vec<VocabularyEntry>,
    /// Where the topic was loaded from.
    pub origin: TopicOrigin,
}

impl VocabularyTopic {
    /// Creates a topic, deriving its id from `origin` and `name`.
    pub fn new(name: impl Into<String>, origin: TopicOrigin) -> Self {
        let name = name.into();
        let id = topic_id(&name, &origin);
        Self {
            id,
            name,
            entries: Vec::new(),
            origin,
        }
    }

    /// Appends an entry with the id of data row `row`.
    pub fn push_entry(
        &mut self,
        row: usize,
        source_term: impl Into<String>,
        plural: Option<String>,
        target_term: impl Into<String>,
    ) {
        self.entries.push(VocabularyEntry {
            id: format!("{}#{}", self.id, row),
            source_term: source_term.into(),
            target_term: target_term.into(),
            plural,
        });
    }

    /// Returns `true` for user-imported topics.
    pub fn is_user(&self) -> bool {
        self.origin.is_user()
    }

    /// Ids of the current entries.
    pub fn entry_ids(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Finds an entry by id.
    pub fn entry(&self, id: &str) -> Option<&VocabularyEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Identity key of this topic.
    pub fn identity_key(&self) -> String {
        identity::topic_key(self.origin.kind(), &self.name)
    }

    /// Identity key of `entry` within this topic.
    pub fn entry_identity_key(&self, entry: &VocabularyEntry) -> String {
        identity::entry_key(
            self.origin.kind(),
            &self.name,
            &entry.source_term,
            &entry.target_term,
        )
    }
}

/// Derives a topic id from its origin.
pub fn topic_id(name: &str, origin: &TopicOrigin) -> String {
    match origin {
        TopicOrigin::Bundled => format!("bundle:{}", name.to_lowercase()),
        TopicOrigin::UserImported { path } => format!(
            "user:{}",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string())
        ),
    }
}

/// Display name for a topic file: the file stem with `_` shown as a space.
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace('_', " "))
        .unwrap_or_default()
}

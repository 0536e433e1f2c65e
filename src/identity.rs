//! Content-derived identity keys.
//!
//! Generated topic and entry ids may change between reloads. The keys built
//! here depend only on content, so saved state can be matched to the new ids.
//! Keys follow row reordering but not renames: renaming a topic or changing
//! a term yields a different key.

use std::fmt;

/// Where a topic comes from, as far as identity is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginKind {
    /// Shipped with the application.
    Bundle,
    /// Imported by the user.
    User,
}

impl OriginKind {
    /// Maps the snapshot `isUserTopic` flag to an origin.
    pub fn from_user_flag(is_user: bool) -> Self {
        if is_user { Self::User } else { Self::Bundle }
    }

    /// Key prefix for this origin.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bundle => "bundle",
            Self::User => "user",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Builds the key `origin|topic` for a topic.
///
/// ```rust
/// use vocabvault::identity::{OriginKind, topic_key};
///
/// assert_eq!(topic_key(OriginKind::User, "  Food "), "user|food");
/// ```
pub fn topic_key(origin: OriginKind, topic_name: &str) -> String {
    format!("{}|{}", origin, normalize(topic_name))
}

/// Builds the key `origin|topic|source|target` for an entry.
///
/// ```rust
/// use vocabvault::identity::{OriginKind, entry_key};
///
/// assert_eq!(
///     entry_key(OriginKind::Bundle, "Food", "der Tisch ", "Table"),
///     "bundle|food|der tisch|table"
/// );
/// ```
pub fn entry_key(
    origin: OriginKind,
    topic_name: &str,
    source_term: &str,
    target_term: &str,
) -> String {
    format!(
        "{}|{}|{}|{}",
        origin,
        normalize(topic_name),
        normalize(source_term),
        normalize(target_term)
    )
}

//! Portable snapshots of study state.
//!
//! A [`Snapshot`] carries the raw practice and progress maps together with
//! identity signatures of every topic and entry that was loaded at export
//! time. [`reconcile`] uses those signatures to move the saved state onto
//! the ids of a freshly loaded topic set, even if every id changed.
//!
//! # Example
//!
//! ```rust,no_run
//! use vocabvault::snapshot::{read_snapshot, reconcile};
//! use vocabvault::topic::load_library;
//!
//! let snapshot = read_snapshot("backup/vocabvault-snapshot.json")?;
//! let topics = load_library(None, Some("topics".as_ref()))?;
//! let state = reconcile(&snapshot, &topics);
//! println!("restored {} cards", state.practice_states.len());
//! # Ok::<(), vocabvault::Error>(())
//! ```

mod autosave;

pub use autosave::{AutoSaveConfig, AutoSaver, DEFAULT_SNAPSHOT_FILE_NAME};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::identity::{self, OriginKind};
use crate::import::{sanitize_file_name, unique_destination};
use crate::state::{PracticeCardState, PracticeStore, ProgressStore, TopicProgressState};
use crate::topic::{VocabularyTopic, write_topic_file};
use crate::{Error, Result};

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Exported study state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version; files without one are version 1.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Export time.
    pub saved_at: DateTime<Utc>,
    /// Practice states keyed by entry id at export time.
    pub practice_states: BTreeMap<String, PracticeCardState>,
    /// Progress keyed by topic id at export time.
    pub topic_progress_states: BTreeMap<String, TopicProgressState>,
    /// Contents of every user topic, for restoring on another device.
    #[serde(default)]
    pub user_topics: Vec<SnapshotTopic>,
    /// One per entry that has practice state or completed progress.
    #[serde(default)]
    pub entry_signatures: Vec<EntrySignature>,
    /// One per topic that has progress.
    #[serde(default)]
    pub topic_signatures: Vec<TopicSignature>,
}

/// A user-imported topic carried inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTopic {
    /// Topic display name.
    pub name: String,
    /// Rows in file order.
    pub entries: Vec<SnapshotEntry>,
}

/// One row of a [`SnapshotTopic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    /// First column.
    pub source_term: String,
    /// Second column, omitted when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    /// Third column.
    pub target_term: String,
}

/// Content identity of an entry at export time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySignature {
    /// Entry id the state was stored under.
    pub entry_id: String,
    /// Name of the owning topic.
    pub topic_name: String,
    /// Whether the owning topic was user-imported.
    pub is_user_topic: bool,
    /// Source term at export time.
    pub source_term: String,
    /// Target term at export time.
    pub target_term: String,
}

impl EntrySignature {
    /// Identity key of the signed entry.
    pub fn key(&self) -> String {
        identity::entry_key(
            OriginKind::from_user_flag(self.is_user_topic),
            &self.topic_name,
            &self.source_term,
            &self.target_term,
        )
    }
}

/// Content identity of a topic at export time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSignature {
    /// Topic id the progress was stored under.
    pub topic_id: String,
    /// Topic name at export time.
    pub topic_name: String,
    /// Whether the topic was user-imported.
    pub is_user_topic: bool,
}

impl TopicSignature {
    /// Identity key of the signed topic.
    pub fn key(&self) -> String {
        identity::topic_key(OriginKind::from_user_flag(self.is_user_topic), &self.topic_name)
    }
}

/// Builds a snapshot of `practice` and `progress` for the loaded `topics`.
pub fn export(
    topics: &[VocabularyTopic],
    practice: &BTreeMap<String, PracticeCardState>,
    progress: &BTreeMap<String, TopicProgressState>,
) -> Snapshot {
    let mut entry_signatures = Vec::new();
    let mut topic_signatures = Vec::with_capacity(topics.len());
    let mut user_topics = Vec::new();

    for topic in topics {
        topic_signatures.push(TopicSignature {
            topic_id: topic.id.clone(),
            topic_name: topic.name.clone(),
            is_user_topic: topic.is_user(),
        });
        entry_signatures.extend(topic.entries.iter().map(|entry| EntrySignature {
            entry_id: entry.id.clone(),
            topic_name: topic.name.clone(),
            is_user_topic: topic.is_user(),
            source_term: entry.source_term.clone(),
            target_term: entry.target_term.clone(),
        }));
        if topic.is_user() {
            user_topics.push(SnapshotTopic {
                name: topic.name.clone(),
                entries: topic
                    .entries
                    .iter()
                    .map(|e| SnapshotEntry {
                        source_term: e.source_term.clone(),
                        plural: e.plural.clone(),
                        target_term: e.target_term.clone(),
                    })
                    .collect(),
            });
        }
    }

    Snapshot {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        practice_states: practice.clone(),
        topic_progress_states: progress.clone(),
        user_topics,
        entry_signatures,
        topic_signatures,
    }
}

/// State maps rebuilt from a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciledState {
    /// Practice states keyed by current entry ids.
    pub practice_states: BTreeMap<String, PracticeCardState>,
    /// Progress keyed by current topic ids.
    pub progress_states: BTreeMap<String, TopicProgressState>,
    /// Practice states whose entry no longer exists.
    pub dropped_practice: usize,
    /// Progress states whose topic no longer exists.
    pub dropped_progress: usize,
}

trait Signature {
    fn signed_id(&self) -> &str;
    fn key(&self) -> String;
}

impl Signature for EntrySignature {
    fn signed_id(&self) -> &str {
        &self.entry_id
    }

    fn key(&self) -> String {
        EntrySignature::key(self)
    }
}

impl Signature for TopicSignature {
    fn signed_id(&self) -> &str {
        &self.topic_id
    }

    fn key(&self) -> String {
        TopicSignature::key(self)
    }
}

/// Old id to new id, through identity keys.
///
/// Without signatures ids are taken as they are. When several new entities
/// share a key, the first one in load order wins.
struct IdRemap<'a> {
    map: Option<HashMap<&'a str, &'a str>>,
}

impl<'a> IdRemap<'a> {
    fn build<S: Signature>(
        signatures: &'a [S],
        current: impl Iterator<Item = (String, &'a str)>,
    ) -> Self {
        if signatures.is_empty() {
            return Self { map: None };
        }
        let mut by_key: HashMap<String, &'a str> = HashMap::new();
        for (key, id) in current {
            by_key.entry(key).or_insert(id);
        }
        let mut map = HashMap::with_capacity(signatures.len());
        for signature in signatures {
            if let Some(new_id) = by_key.get(&signature.key()) {
                map.entry(signature.signed_id()).or_insert(*new_id);
            }
        }
        Self { map: Some(map) }
    }

    fn get<'b>(&self, old: &'b str) -> Option<&'b str>
    where
        'a: 'b,
    {
        match &self.map {
            Some(map) => map.get(old).copied(),
            None => Some(old),
        }
    }
}

/// Moves snapshot state onto the ids of `topics`.
///
/// State that cannot be matched is dropped. Completed entry ids are remapped
/// too and then limited to the entries their topic has now. Snapshots
/// without signatures are copied by id.
pub fn reconcile(snapshot: &Snapshot, topics: &[VocabularyTopic]) -> ReconciledState {
    let entries = IdRemap::build(
        &snapshot.entry_signatures,
        topics.iter().flat_map(|topic| {
            topic
                .entries
                .iter()
                .map(move |entry| (topic.entry_identity_key(entry), entry.id.as_str()))
        }),
    );
    let topic_ids = IdRemap::build(
        &snapshot.topic_signatures,
        topics.iter().map(|t| (t.identity_key(), t.id.as_str())),
    );
    let by_id: HashMap<&str, &VocabularyTopic> = topics.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut state = ReconciledState::default();

    for (old_id, card) in &snapshot.practice_states {
        match entries.get(old_id) {
            Some(new_id) => {
                state.practice_states.entry(new_id.to_string()).or_insert(*card);
            }
            None => {
                debug!("dropping practice state of vanished entry {}", old_id);
                state.dropped_practice += 1;
            }
        }
    }

    for (old_id, progress) in &snapshot.topic_progress_states {
        let Some(new_id) = topic_ids.get(old_id) else {
            debug!("dropping progress of vanished topic {}", old_id);
            state.dropped_progress += 1;
            continue;
        };
        let mut remapped = TopicProgressState {
            completed_entry_ids: progress
                .completed_entry_ids
                .iter()
                .filter_map(|id| entries.get(id))
                .map(str::to_string)
                .collect::<BTreeSet<_>>(),
            completion_count: progress.completion_count,
        };
        if let Some(topic) = by_id.get(new_id) {
            remapped.normalize(&topic.entry_ids());
        }
        state.progress_states.entry(new_id.to_string()).or_insert(remapped);
    }

    if state.dropped_practice + state.dropped_progress > 0 {
        info!(
            "reconcile dropped {} practice and {} progress states",
            state.dropped_practice, state.dropped_progress
        );
    }
    state
}

/// Writes `snapshot` as pretty JSON with sorted keys to `folder/file_name`.
///
/// The document is written to a temporary file in `folder` and renamed over
/// any previous snapshot.
pub fn write_snapshot(snapshot: &Snapshot, folder: &Path, file_name: &str) -> Result<PathBuf> {
    let path = folder.join(file_name);
    let copy_failed = |source: io::Error| Error::CopyFailed {
        path: path.clone(),
        source,
    };

    // Value objects are BTreeMap backed, which sorts every key.
    let value = serde_json::to_value(snapshot)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');

    fs::create_dir_all(folder).map_err(copy_failed)?;
    let mut temp = NamedTempFile::new_in(folder).map_err(copy_failed)?;
    temp.write_all(text.as_bytes()).map_err(copy_failed)?;
    temp.as_file().sync_all().map_err(copy_failed)?;
    temp.persist(&path).map_err(|e| copy_failed(e.error))?;

    info!("wrote snapshot {}", path.display());
    Ok(path)
}

/// Reads a snapshot document.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Snapshot> {
    let bytes = fs::read(path.as_ref())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes the user topics of `snapshot` back into topic storage.
///
/// Each topic becomes `<sanitized name>.csv`. A topic whose file is already
/// stored with identical rows is skipped; a different file of the same name
/// is kept and the topic gets a suffixed name. Returns the file names written.
pub fn restore_user_topics(snapshot: &Snapshot, storage_dir: &Path) -> Result<Vec<String>> {
    fs::create_dir_all(storage_dir).map_err(|source| Error::CopyFailed {
        path: storage_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(snapshot.user_topics.len());
    for topic in &snapshot.user_topics {
        let file_name = sanitize_file_name(&topic.name);
        let path = storage_dir.join(&file_name);
        if path.exists() && same_topic_file(&path, topic) {
            debug!("user topic '{}' already present", topic.name);
            continue;
        }
        let path = unique_destination(storage_dir, &file_name);
        write_topic_file(
            &path,
            topic.entries.iter().map(|e| {
                (
                    e.source_term.as_str(),
                    e.plural.as_deref(),
                    e.target_term.as_str(),
                )
            }),
        )?;
        written.push(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(file_name),
        );
    }
    Ok(written)
}

fn same_topic_file(path: &Path, topic: &SnapshotTopic) -> bool {
    let Ok(existing) = crate::topic::load_topic_file(path, OriginKind::User) else {
        return false;
    };
    existing.entries.len() == topic.entries.len()
        && existing.entries.iter().zip(&topic.entries).all(|(a, b)| {
            a.source_term == b.source_term
                && a.target_term == b.target_term
                && a.plural == b.plural
        })
}

/// Binds the study stores for export, restore and auto-save.
#[derive(Debug, Default)]
pub struct SnapshotManager {
    practice: Option<Arc<Mutex<PracticeStore>>>,
    progress: Option<Arc<Mutex<ProgressStore>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl SnapshotManager {
    /// Creates a manager with no stores bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the stores that later calls read and write.
    pub fn bind(&mut self, practice: Arc<Mutex<PracticeStore>>, progress: Arc<Mutex<ProgressStore>>) {
        self.practice = Some(practice);
        self.progress = Some(progress);
    }

    /// Whether both stores are attached.
    pub fn is_bound(&self) -> bool {
        self.practice.is_some() && self.progress.is_some()
    }

    fn stores(&self) -> Result<(&Arc<Mutex<PracticeStore>>, &Arc<Mutex<ProgressStore>>)> {
        match (&self.practice, &self.progress) {
            (Some(practice), Some(progress)) => Ok((practice, progress)),
            _ => Err(Error::StoresUnavailable),
        }
    }

    /// Exports the bound stores against `topics`.
    pub fn export(&self, topics: &[VocabularyTopic]) -> Result<Snapshot> {
        let (practice, progress) = self.stores()?;
        let practice = lock(practice);
        let progress = lock(progress);
        Ok(export(topics, practice.states(), progress.states()))
    }

    /// Reconciles `snapshot` against `topics` and replaces the stores' contents.
    pub fn restore(&self, snapshot: &Snapshot, topics: &[VocabularyTopic]) -> Result<ReconciledState> {
        let (practice, progress) = self.stores()?;
        let state = reconcile(snapshot, topics);
        lock(practice).replace_all(state.practice_states.clone());
        lock(progress).replace_all(state.progress_states.clone());
        info!(
            "restored {} practice and {} progress states",
            state.practice_states.len(),
            state.progress_states.len()
        );
        Ok(state)
    }

    /// Starts writing a snapshot shortly after each store change.
    ///
    /// `topics` is read at save time. Stop with
    /// [`stop_autosave`](Self::stop_autosave).
    pub fn start_autosave(
        &self,
        config: AutoSaveConfig,
        topics: Arc<RwLock<Vec<VocabularyTopic>>>,
    ) -> Result<AutoSaver> {
        let (practice, progress) = self.stores()?;
        let (tx, rx) = mpsc::channel();
        let practice_id = lock(practice).subscribe(tx.clone());
        let progress_id = lock(progress).subscribe(tx);

        let practice = Arc::clone(practice);
        let progress = Arc::clone(progress);
        let saver = AutoSaver::spawn(config, rx, move || {
            let topics = topics.read().unwrap_or_else(|e| e.into_inner());
            let practice = lock(&practice);
            let progress = lock(&progress);
            Ok(export(&topics, practice.states(), progress.states()))
        })?;
        Ok(saver.with_subscriptions(practice_id, progress_id))
    }

    /// Unsubscribes the auto-saver, lets it flush a pending save and waits.
    ///
    /// Other subscribers of the stores keep receiving events.
    pub fn stop_autosave(&self, mut saver: AutoSaver) -> Result<()> {
        let (practice, progress) = self.stores()?;
        if let Some((practice_id, progress_id)) = saver.take_subscriptions() {
            lock(practice).unsubscribe(practice_id);
            lock(progress).unsubscribe(progress_id);
        }
        saver.join();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::TopicOrigin;

    fn user_topic(file: &str, name: &str, rows: &[(&str, &str)]) -> VocabularyTopic {
        let mut topic = VocabularyTopic::new(
            name,
            TopicOrigin::UserImported {
                path: PathBuf::from(file),
            },
        );
        for (row, (source, target)) in rows.iter().enumerate() {
            topic.push_entry(row, *source, None, *target);
        }
        topic
    }

    fn active(wrong: u32) -> PracticeCardState {
        PracticeCardState {
            is_active: true,
            correct_streak: 0,
            wrong_count: wrong,
        }
    }

    #[test]
    fn test_reconcile_follows_reordered_rows() {
        let before = vec![user_topic("a.csv", "Food", &[("Brot", "bread"), ("Milch", "milk")])];
        let practice = BTreeMap::from([("user:a.csv#1".to_string(), active(2))]);
        let snapshot = export(&before, &practice, &BTreeMap::new());

        let after = vec![user_topic("a.csv", "Food", &[("Milch", "milk"), ("Brot", "bread")])];
        let state = reconcile(&snapshot, &after);
        assert_eq!(state.practice_states.len(), 1);
        assert_eq!(state.practice_states["user:a.csv#0"], active(2));
    }

    #[test]
    fn test_reconcile_follows_renamed_file() {
        let before = vec![user_topic("a.csv", "Food", &[("Brot", "bread")])];
        let progress = BTreeMap::from([(
            "user:a.csv".to_string(),
            TopicProgressState {
                completed_entry_ids: BTreeSet::from(["user:a.csv#0".to_string()]),
                completion_count: 3,
            },
        )]);
        let snapshot = export(&before, &BTreeMap::new(), &progress);

        let after = vec![user_topic("Food_1.csv", "Food", &[("Brot", "bread")])];
        let state = reconcile(&snapshot, &after);
        let restored = &state.progress_states["user:Food_1.csv"];
        assert_eq!(restored.completion_count, 3);
        assert_eq!(
            restored.completed_entry_ids,
            BTreeSet::from(["user:Food_1.csv#0".to_string()])
        );
    }

    #[test]
    fn test_reconcile_without_signatures_copies_ids() {
        let topics = vec![user_topic("a.csv", "Food", &[("Brot", "bread")])];
        let snapshot = Snapshot {
            version: 1,
            saved_at: Utc::now(),
            practice_states: BTreeMap::from([("legacy-id".to_string(), active(1))]),
            topic_progress_states: BTreeMap::new(),
            user_topics: Vec::new(),
            entry_signatures: Vec::new(),
            topic_signatures: Vec::new(),
        };
        let state = reconcile(&snapshot, &topics);
        assert_eq!(state.practice_states["legacy-id"], active(1));
        assert_eq!(state.dropped_practice, 0);
    }

    #[test]
    fn test_duplicate_keys_first_wins() {
        let topics = vec![user_topic(
            "a.csv",
            "Food",
            &[("Brot", "bread"), ("brot ", "Bread")],
        )];
        let practice = BTreeMap::from([("user:a.csv#0".to_string(), active(1))]);
        let snapshot = export(&topics, &practice, &BTreeMap::new());
        let state = reconcile(&snapshot, &topics);
        assert_eq!(state.practice_states.keys().collect::<Vec<_>>(), vec!["user:a.csv#0"]);
    }

    #[test]
    fn test_manager_requires_bound_stores() {
        let manager = SnapshotManager::new();
        assert!(!manager.is_bound());
        assert!(matches!(manager.export(&[]), Err(Error::StoresUnavailable)));
        let snapshot = export(&[], &BTreeMap::new(), &BTreeMap::new());
        assert!(matches!(
            manager.restore(&snapshot, &[]),
            Err(Error::StoresUnavailable)
        ));
    }

    #[test]
    fn test_json_shape_sorted_and_tolerant() {
        let topics = vec![user_topic("a.csv", "Food", &[("Brot", "bread")])];
        let snapshot = export(&topics, &BTreeMap::new(), &BTreeMap::new());
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&snapshot, dir.path(), "snap.json").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let keys: Vec<_> = [
            "\"entrySignatures\"",
            "\"practiceStates\"",
            "\"savedAt\"",
            "\"topicProgressStates\"",
            "\"topicSignatures\"",
            "\"userTopics\"",
            "\"version\"",
        ]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(read_snapshot(&path).unwrap(), snapshot);

        let minimal = r#"{"savedAt":"2024-05-01T10:00:00Z","practiceStates":{},"topicProgressStates":{}}"#;
        let parsed: Snapshot = serde_json::from_str(minimal).unwrap();
        assert_eq!(parsed.version, 1);
        assert!(parsed.user_topics.is_empty() && parsed.entry_signatures.is_empty());
    }

    #[test]
    fn test_restore_user_topics() {
        let topics = vec![user_topic("x/My_Words.csv", "My Words", &[("Brot", "bread")])];
        let snapshot = export(&topics, &BTreeMap::new(), &BTreeMap::new());
        let storage = tempfile::tempdir().unwrap();

        let written = restore_user_topics(&snapshot, storage.path()).unwrap();
        assert_eq!(written, vec!["My_Words.csv"]);
        // Restoring again finds the identical file and writes nothing.
        assert!(restore_user_topics(&snapshot, storage.path()).unwrap().is_empty());
    }
}

//! Snapshot export, reconcile and restore across topic reloads.

mod common;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock, mpsc};
use std::time::Duration;

use common::write_file;
use vocabvault::snapshot::{
    AutoSaveConfig, export, read_snapshot, restore_user_topics, write_snapshot,
};
use vocabvault::state::StoreEvent;
use vocabvault::topic::load_library;
use vocabvault::{
    Error, PracticeStore, ProgressStore, Snapshot, SnapshotManager, StudyConfig, VocabularyTopic,
    reconcile,
};

const ANIMALS: &[u8] = b"Source,Plural,Target\nder Hund,die Hunde,dog\ndie Katze,die Katzen,cat\n";
const ANIMALS_REORDERED: &[u8] =
    b"Source,Plural,Target\ndas Pferd,die Pferde,horse\ndie Katze,die Katzen,cat\nder Hund,die Hunde,dog\n";

fn library(bundled: &Path, user: &Path) -> Vec<VocabularyTopic> {
    load_library(Some(bundled), Some(user)).unwrap()
}

fn entry_id<'a>(topics: &'a [VocabularyTopic], topic_id: &str, source: &str) -> &'a str {
    let topic = topics.iter().find(|t| t.id == topic_id).expect("topic");
    let entry = topic
        .entries
        .iter()
        .find(|e| e.source_term == source)
        .expect("entry");
    &entry.id
}

/// Marks "der Hund" wrong and completes it in both topics.
fn study(topics: &[VocabularyTopic]) -> (PracticeStore, ProgressStore) {
    let config = StudyConfig::default();
    let mut practice = PracticeStore::new(&config);
    let mut progress = ProgressStore::new(&config);
    for topic in topics {
        let id = entry_id(topics, &topic.id, "der Hund");
        practice.mark_wrong(id);
        progress.mark_completed(topic, id);
    }
    (practice, progress)
}

#[test]
fn test_reconcile_against_same_topics_is_identity() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    write_file(bundled.path(), "Animals.csv", ANIMALS);
    write_file(user.path(), "Pets.csv", ANIMALS);
    let topics = library(bundled.path(), user.path());
    let (practice, progress) = study(&topics);

    let snapshot = export(&topics, practice.states(), progress.states());
    let state = reconcile(&snapshot, &topics);

    assert_eq!(&state.practice_states, practice.states());
    assert_eq!(&state.progress_states, progress.states());
    assert_eq!(state.dropped_practice, 0);
    assert_eq!(state.dropped_progress, 0);
}

#[test]
fn test_reordered_rows_keep_their_state() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    write_file(bundled.path(), "Animals.csv", ANIMALS);
    let before = library(bundled.path(), user.path());
    let (practice, progress) = study(&before);
    let snapshot = export(&before, practice.states(), progress.states());

    write_file(bundled.path(), "Animals.csv", ANIMALS_REORDERED);
    let after = library(bundled.path(), user.path());
    let state = reconcile(&snapshot, &after);

    let hund = entry_id(&after, "bundle:animals", "der Hund");
    assert_eq!(hund, "bundle:animals#2");
    assert_eq!(state.practice_states.keys().collect::<Vec<_>>(), vec![hund]);
    assert!(state.practice_states[hund].is_active);
    assert_eq!(
        state.progress_states["bundle:animals"]
            .completed_entry_ids
            .iter()
            .collect::<Vec<_>>(),
        vec![hund]
    );
}

#[test]
fn test_renamed_topic_state_is_dropped() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    write_file(user.path(), "Pets.csv", ANIMALS);
    let before = library(bundled.path(), user.path());
    let (practice, progress) = study(&before);
    let snapshot = export(&before, practice.states(), progress.states());

    std::fs::rename(user.path().join("Pets.csv"), user.path().join("Animals.csv")).unwrap();
    let after = library(bundled.path(), user.path());
    let state = reconcile(&snapshot, &after);

    assert!(state.practice_states.is_empty());
    assert!(state.progress_states.is_empty());
    assert_eq!(state.dropped_practice, 1);
    assert_eq!(state.dropped_progress, 1);
}

#[test]
fn test_same_content_different_origin_does_not_match() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    write_file(user.path(), "Animals.csv", ANIMALS);
    let before = library(bundled.path(), user.path());
    let (practice, progress) = study(&before);
    let snapshot = export(&before, practice.states(), progress.states());

    // The same file now ships bundled instead of imported.
    std::fs::rename(user.path().join("Animals.csv"), bundled.path().join("Animals.csv")).unwrap();
    let after = library(bundled.path(), user.path());
    let state = reconcile(&snapshot, &after);
    assert!(state.practice_states.is_empty());
}

#[test]
fn test_legacy_snapshot_copies_by_id() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    write_file(bundled.path(), "Animals.csv", ANIMALS);
    let topics = library(bundled.path(), user.path());

    let snapshot: Snapshot = serde_json::from_str(
        r#"{
            "savedAt": "2024-03-01T10:00:00Z",
            "practiceStates": {
                "bundle:animals#1": {"isActive": true, "correctStreak": 2, "wrongCount": 3}
            },
            "topicProgressStates": {
                "bundle:animals": {"completedEntryIds": ["bundle:animals#0", "bundle:animals#9"], "completionCount": 4}
            }
        }"#,
    )
    .unwrap();
    assert_eq!(snapshot.version, 1);

    let state = reconcile(&snapshot, &topics);
    assert_eq!(state.practice_states["bundle:animals#1"].wrong_count, 3);
    let progress = &state.progress_states["bundle:animals"];
    assert_eq!(progress.completion_count, 4);
    assert_eq!(progress.completed_entry_ids.len(), 1);
}

#[test]
fn test_snapshot_file_roundtrip() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    let backup = tempfile::tempdir().unwrap();
    write_file(user.path(), "Pets.csv", ANIMALS);
    let topics = library(bundled.path(), user.path());
    let (practice, progress) = study(&topics);

    let snapshot = export(&topics, practice.states(), progress.states());
    let path = write_snapshot(&snapshot, backup.path(), "backup.json").unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.ends_with('\n'));
    let keys: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("  \""))
        .map(|l| l.trim().split('"').nth(1).unwrap_or_default())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    assert_eq!(read_snapshot(&path).unwrap(), snapshot);
}

#[test]
fn test_restore_user_topics_on_fresh_install() {
    let old_user = tempfile::tempdir().unwrap();
    let bundled = tempfile::tempdir().unwrap();
    let fresh = tempfile::tempdir().unwrap();
    write_file(old_user.path(), "Pets.csv", ANIMALS);
    let topics = library(bundled.path(), old_user.path());
    let (practice, progress) = study(&topics);
    let snapshot = export(&topics, practice.states(), progress.states());

    let written = restore_user_topics(&snapshot, fresh.path()).unwrap();
    assert_eq!(written, vec!["Pets.csv"]);
    // Restoring again finds the identical file and writes nothing.
    assert!(restore_user_topics(&snapshot, fresh.path()).unwrap().is_empty());

    let restored = library(bundled.path(), fresh.path());
    let state = reconcile(&snapshot, &restored);
    assert_eq!(state.practice_states.len(), 1);
    assert_eq!(state.dropped_practice, 0);
}

#[test]
fn test_restore_keeps_conflicting_file() {
    let user = tempfile::tempdir().unwrap();
    let bundled = tempfile::tempdir().unwrap();
    write_file(user.path(), "Pets.csv", ANIMALS);
    let topics = library(bundled.path(), user.path());
    let snapshot = export(&topics, &BTreeMap::new(), &BTreeMap::new());

    write_file(user.path(), "Pets.csv", ANIMALS_REORDERED);
    let written = restore_user_topics(&snapshot, user.path()).unwrap();
    assert_eq!(written, vec!["Pets_1.csv"]);
    assert_eq!(std::fs::read(user.path().join("Pets.csv")).unwrap(), ANIMALS_REORDERED);
}

#[test]
fn test_manager_requires_bound_stores() {
    let manager = SnapshotManager::new();
    assert!(!manager.is_bound());
    assert!(matches!(manager.export(&[]), Err(Error::StoresUnavailable)));
}

#[test]
fn test_manager_restore_replaces_stores() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    write_file(bundled.path(), "Animals.csv", ANIMALS);
    let topics = library(bundled.path(), user.path());
    let (practice, progress) = study(&topics);
    let snapshot = export(&topics, practice.states(), progress.states());

    let config = StudyConfig::default();
    let practice = Arc::new(Mutex::new(PracticeStore::new(&config)));
    let progress = Arc::new(Mutex::new(ProgressStore::new(&config)));
    practice.lock().unwrap().mark_wrong("stale#0");

    let mut manager = SnapshotManager::new();
    manager.bind(Arc::clone(&practice), Arc::clone(&progress));
    let state = manager.restore(&snapshot, &topics).unwrap();

    assert_eq!(practice.lock().unwrap().states(), &state.practice_states);
    assert!(!practice.lock().unwrap().states().contains_key("stale#0"));
    assert_eq!(progress.lock().unwrap().states().len(), 1);
}

#[test]
fn test_autosave_writes_after_changes() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    let backup = tempfile::tempdir().unwrap();
    write_file(bundled.path(), "Animals.csv", ANIMALS);
    let topics = library(bundled.path(), user.path());
    let card = entry_id(&topics, "bundle:animals", "die Katze").to_string();

    let config = StudyConfig::default();
    let practice = Arc::new(Mutex::new(PracticeStore::new(&config)));
    let progress = Arc::new(Mutex::new(ProgressStore::new(&config)));
    let mut manager = SnapshotManager::new();
    manager.bind(Arc::clone(&practice), Arc::clone(&progress));

    let autosave = AutoSaveConfig::new(backup.path()).debounce(Duration::from_millis(20));
    let path = autosave.path();
    let saver = manager
        .start_autosave(autosave, Arc::new(RwLock::new(topics)))
        .unwrap();

    practice.lock().unwrap().mark_wrong(&card);
    practice.lock().unwrap().mark_wrong(&card);
    manager.stop_autosave(saver).unwrap();

    let snapshot = read_snapshot(&path).unwrap();
    assert_eq!(snapshot.practice_states[&card].wrong_count, 2);
    assert_eq!(snapshot.topic_signatures.len(), 1);
}

#[test]
fn test_stopping_autosave_keeps_other_subscribers() {
    let backup = tempfile::tempdir().unwrap();
    let config = StudyConfig::default();
    let practice = Arc::new(Mutex::new(PracticeStore::new(&config)));
    let progress = Arc::new(Mutex::new(ProgressStore::new(&config)));
    let mut manager = SnapshotManager::new();
    manager.bind(Arc::clone(&practice), Arc::clone(&progress));

    let (tx, rx) = mpsc::channel();
    practice.lock().unwrap().subscribe(tx);

    let autosave = AutoSaveConfig::new(backup.path()).debounce(Duration::from_millis(20));
    let saver = manager
        .start_autosave(autosave, Arc::new(RwLock::new(Vec::new())))
        .unwrap();
    manager.stop_autosave(saver).unwrap();

    practice.lock().unwrap().mark_wrong("bundle:animals#0");
    assert_eq!(
        rx.try_recv().unwrap(),
        StoreEvent::PracticeChanged {
            entry_id: Some("bundle:animals#0".to_string())
        }
    );
}

//! Per-card practice state and per-topic progress.
//!
//! Both stores are plain in-memory maps keyed by entry or topic id. Every
//! mutation sends one [`StoreEvent`] to each subscribed channel, which is
//! how the snapshot auto-saver learns about changes.

pub mod backend;

pub use backend::{DirectoryBackend, MemoryBackend, StateBackend};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::Sender;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::topic::VocabularyTopic;

/// Default number of consecutive correct answers that retires a card.
pub const DEFAULT_GOAL_STREAK: u32 = 5;

/// Study settings shared by the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyConfig {
    /// Consecutive correct answers after which a card leaves practice.
    pub goal_streak: u32,
    /// Storage name of the practice state map.
    pub practice_storage_key: String,
    /// Storage name of the topic progress map.
    pub progress_storage_key: String,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            goal_streak: DEFAULT_GOAL_STREAK,
            practice_storage_key: "practiceStates".to_string(),
            progress_storage_key: "topicProgressStates".to_string(),
        }
    }
}

impl StudyConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the goal streak; values below 1 are raised to 1.
    pub fn goal_streak(mut self, streak: u32) -> Self {
        self.goal_streak = streak.max(1);
        self
    }

    /// Sets the storage names of both maps.
    pub fn storage_keys(mut self, practice: impl Into<String>, progress: impl Into<String>) -> Self {
        self.practice_storage_key = practice.into();
        self.progress_storage_key = progress.into();
        self
    }
}

/// Practice state of one card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PracticeCardState {
    /// Whether the card is in the practice pool.
    pub is_active: bool,
    /// Correct answers in a row since the last wrong one.
    pub correct_streak: u32,
    /// Wrong answers ever given.
    pub wrong_count: u32,
}

impl PracticeCardState {
    fn record_wrong(&mut self) {
        self.is_active = true;
        self.correct_streak = 0;
        self.wrong_count = self.wrong_count.saturating_add(1);
    }

    fn record_correct(&mut self, goal_streak: u32) {
        self.correct_streak = self.correct_streak.saturating_add(1);
        if self.correct_streak >= goal_streak {
            self.is_active = false;
        }
    }
}

/// Completion progress of one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicProgressState {
    /// Entries completed in the current round.
    pub completed_entry_ids: BTreeSet<String>,
    /// Rounds finished with every entry completed.
    pub completion_count: u32,
}

impl TopicProgressState {
    /// Drops completed ids that are not in `current`.
    ///
    /// Returns `true` if anything was removed. An empty `current` clears
    /// the completed set.
    pub fn normalize(&mut self, current: &BTreeSet<&str>) -> bool {
        let before = self.completed_entry_ids.len();
        self.completed_entry_ids
            .retain(|id| current.contains(id.as_str()));
        self.completed_entry_ids.len() != before
    }

    /// Returns `true` if every one of `total` entries is completed.
    pub fn is_complete(&self, total: usize) -> bool {
        total > 0 && self.completed_entry_ids.len() >= total
    }
}

/// Change notification sent by the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A card's practice state changed; `None` means the whole map.
    PracticeChanged {
        /// Changed card.
        entry_id: Option<String>,
    },
    /// A topic's progress changed; `None` means the whole map.
    ProgressChanged {
        /// Changed topic.
        topic_id: Option<String>,
    },
}

/// Handle for removing one subscriber from the store that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(SubscriptionId, Sender<StoreEvent>)>,
}

impl Subscribers {
    fn add(&mut self, tx: Sender<StoreEvent>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.senders.push((id, tx));
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(other, _)| *other != id);
        self.senders.len() != before
    }

    fn clear(&mut self) {
        self.senders.clear();
    }

    fn notify(&mut self, event: StoreEvent) {
        self.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

/// Practice state of every card, keyed by entry id.
#[derive(Debug)]
pub struct PracticeStore {
    states: BTreeMap<String, PracticeCardState>,
    goal_streak: u32,
    storage_key: String,
    subscribers: Subscribers,
}

impl PracticeStore {
    /// Creates an empty store.
    pub fn new(config: &StudyConfig) -> Self {
        Self {
            states: BTreeMap::new(),
            goal_streak: config.goal_streak.max(1),
            storage_key: config.practice_storage_key.clone(),
            subscribers: Subscribers::default(),
        }
    }

    /// Loads the store from `backend`; a missing value yields an empty store.
    pub fn load(config: &StudyConfig, backend: &dyn StateBackend) -> Result<Self> {
        let mut store = Self::new(config);
        if let Some(bytes) = backend.load(&store.storage_key)? {
            store.states = serde_json::from_slice(&bytes)?;
        }
        debug!("loaded {} practice states", store.states.len());
        Ok(store)
    }

    /// Writes the store to `backend`.
    pub fn save(&self, backend: &dyn StateBackend) -> Result<()> {
        backend.store(&self.storage_key, &serde_json::to_vec_pretty(&self.states)?)
    }

    /// Sends future change events to `tx` until unsubscribed or `tx`'s
    /// receiver is dropped.
    pub fn subscribe(&mut self, tx: Sender<StoreEvent>) -> SubscriptionId {
        self.subscribers.add(tx)
    }

    /// Removes one subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Drops every subscriber.
    pub fn unsubscribe_all(&mut self) {
        self.subscribers.clear();
    }

    /// Every recorded card state.
    pub fn states(&self) -> &BTreeMap<String, PracticeCardState> {
        &self.states
    }

    /// State of `entry_id`; the default state if none was recorded.
    pub fn get(&self, entry_id: &str) -> PracticeCardState {
        self.states.get(entry_id).copied().unwrap_or_default()
    }

    /// Records a wrong answer: the card becomes active and its streak resets.
    pub fn mark_wrong(&mut self, entry_id: &str) -> PracticeCardState {
        let state = self.states.entry(entry_id.to_string()).or_default();
        state.record_wrong();
        let state = *state;
        self.changed(Some(entry_id));
        state
    }

    /// Records a correct answer; reaching the goal streak deactivates the card.
    pub fn mark_correct(&mut self, entry_id: &str) -> PracticeCardState {
        let goal = self.goal_streak;
        let state = self.states.entry(entry_id.to_string()).or_default();
        state.record_correct(goal);
        let state = *state;
        self.changed(Some(entry_id));
        state
    }

    /// Forgets the state of one card.
    pub fn reset(&mut self, entry_id: &str) {
        if self.states.remove(entry_id).is_some() {
            self.changed(Some(entry_id));
        }
    }

    /// Forgets every card.
    pub fn reset_all(&mut self) {
        self.states.clear();
        self.changed(None);
    }

    /// Ids of cards currently in practice.
    pub fn active_ids(&self) -> BTreeSet<&str> {
        self.states
            .iter()
            .filter(|(_, s)| s.is_active)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Replaces every state at once.
    pub fn replace_all(&mut self, states: BTreeMap<String, PracticeCardState>) {
        self.states = states;
        self.changed(None);
    }

    fn changed(&mut self, entry_id: Option<&str>) {
        self.subscribers.notify(StoreEvent::PracticeChanged {
            entry_id: entry_id.map(str::to_string),
        });
    }
}

/// Progress of every topic, keyed by topic id.
///
/// Reads through [`progress_for`](Self::progress_for) keep each topic's
/// completed set within its current entries.
#[derive(Debug)]
pub struct ProgressStore {
    states: BTreeMap<String, TopicProgressState>,
    storage_key: String,
    subscribers: Subscribers,
}

impl ProgressStore {
    /// Creates an empty store.
    pub fn new(config: &StudyConfig) -> Self {
        Self {
            states: BTreeMap::new(),
            storage_key: config.progress_storage_key.clone(),
            subscribers: Subscribers::default(),
        }
    }

    /// Loads the store from `backend`; a missing value yields an empty store.
    pub fn load(config: &StudyConfig, backend: &dyn StateBackend) -> Result<Self> {
        let mut store = Self::new(config);
        if let Some(bytes) = backend.load(&store.storage_key)? {
            store.states = serde_json::from_slice(&bytes)?;
        }
        debug!("loaded {} topic progress states", store.states.len());
        Ok(store)
    }

    /// Writes the store to `backend`.
    pub fn save(&self, backend: &dyn StateBackend) -> Result<()> {
        backend.store(&self.storage_key, &serde_json::to_vec_pretty(&self.states)?)
    }

    /// Sends future change events to `tx` until unsubscribed or `tx`'s
    /// receiver is dropped.
    pub fn subscribe(&mut self, tx: Sender<StoreEvent>) -> SubscriptionId {
        self.subscribers.add(tx)
    }

    /// Removes one subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Drops every subscriber.
    pub fn unsubscribe_all(&mut self) {
        self.subscribers.clear();
    }

    /// Raw stored progress, not normalized.
    pub fn states(&self) -> &BTreeMap<String, TopicProgressState> {
        &self.states
    }

    /// Progress of `topic`, normalized against its current entries.
    ///
    /// If stale ids had to be removed, the reduced state is stored.
    pub fn progress_for(&mut self, topic: &VocabularyTopic) -> TopicProgressState {
        let Some(state) = self.states.get_mut(&topic.id) else {
            return TopicProgressState::default();
        };
        let changed = state.normalize(&topic.entry_ids());
        let snapshot = state.clone();
        if changed {
            debug!("dropped stale completed ids of topic {}", topic.id);
            self.changed(Some(topic.id.as_str()));
        }
        snapshot
    }

    /// Normalizes every stored topic that appears in `topics`.
    pub fn normalize_all(&mut self, topics: &[VocabularyTopic]) {
        for topic in topics {
            self.progress_for(topic);
        }
    }

    /// Marks `entry_id` of `topic` as completed.
    ///
    /// Returns `false` if the entry does not belong to the topic.
    pub fn mark_completed(&mut self, topic: &VocabularyTopic, entry_id: &str) -> bool {
        if topic.entry(entry_id).is_none() {
            return false;
        }
        let state = self.states.entry(topic.id.clone()).or_default();
        if state.completed_entry_ids.insert(entry_id.to_string()) {
            self.changed(Some(topic.id.as_str()));
        }
        true
    }

    /// Starts a new round through `topic`.
    ///
    /// The completed set is cleared. The completion count is incremented
    /// only if every current entry had been completed; the return value says
    /// whether it was.
    pub fn restart(&mut self, topic: &VocabularyTopic) -> bool {
        let mut state = self.progress_for(topic);
        let complete = state.is_complete(topic.entries.len());
        if complete {
            state.completion_count = state.completion_count.saturating_add(1);
        }
        state.completed_entry_ids.clear();
        self.states.insert(topic.id.clone(), state);
        self.changed(Some(topic.id.as_str()));
        complete
    }

    /// Forgets the progress of one topic.
    pub fn reset(&mut self, topic_id: &str) {
        if self.states.remove(topic_id).is_some() {
            self.changed(Some(topic_id));
        }
    }

    /// Forgets every topic.
    pub fn reset_all(&mut self) {
        self.states.clear();
        self.changed(None);
    }

    /// Replaces every state at once.
    pub fn replace_all(&mut self, states: BTreeMap<String, TopicProgressState>) {
        self.states = states;
        self.changed(None);
    }

    fn changed(&mut self, topic_id: Option<&str>) {
        self.subscribers.notify(StoreEvent::ProgressChanged {
            topic_id: topic_id.map(str::to_string),
        });
    }
}

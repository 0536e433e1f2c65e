//! Debounced background snapshot writer.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};

use super::{Snapshot, write_snapshot};
use crate::Result;
use crate::state::{StoreEvent, SubscriptionId};

/// File name used for automatic snapshots.
pub const DEFAULT_SNAPSHOT_FILE_NAME: &str = "vocabvault-snapshot.json";

/// Where and how often automatic snapshots are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last change before a snapshot is written.
    pub debounce: Duration,
    /// Folder receiving the snapshot file.
    pub folder: PathBuf,
    /// Snapshot file name inside `folder`.
    pub file_name: String,
}

impl AutoSaveConfig {
    /// Saves into `folder` with a two second debounce.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            debounce: Duration::from_secs(2),
            folder: folder.into(),
            file_name: DEFAULT_SNAPSHOT_FILE_NAME.to_string(),
        }
    }

    /// Sets the quiet period.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the snapshot file name.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Full path of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }
}

/// Handle to the background writer thread.
///
/// The thread runs until every sender of its event channel is gone, then
/// writes any pending change and exits. Failed saves are logged and
/// dropped; they are not retried.
#[derive(Debug)]
pub struct AutoSaver {
    handle: Option<JoinHandle<()>>,
    subscriptions: Option<(SubscriptionId, SubscriptionId)>,
}

impl AutoSaver {
    /// Starts the writer.
    ///
    /// `produce` builds the snapshot to write; it runs on the writer thread.
    pub fn spawn<F>(config: AutoSaveConfig, events: Receiver<StoreEvent>, produce: F) -> Result<Self>
    where
        F: FnMut() -> Result<Snapshot> + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name("snapshot-autosave".into())
            .spawn(move || run(config, events, produce))?;
        Ok(Self {
            handle: Some(handle),
            subscriptions: None,
        })
    }

    /// Records the practice and progress subscriptions feeding this writer.
    pub(super) fn with_subscriptions(mut self, practice: SubscriptionId, progress: SubscriptionId) -> Self {
        self.subscriptions = Some((practice, progress));
        self
    }

    pub(super) fn take_subscriptions(&mut self) -> Option<(SubscriptionId, SubscriptionId)> {
        self.subscriptions.take()
    }

    /// Waits for the writer to exit.
    ///
    /// Returns once every event sender has been dropped.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("snapshot auto-save thread panicked");
            }
        }
    }
}

fn run<F>(config: AutoSaveConfig, events: Receiver<StoreEvent>, mut produce: F)
where
    F: FnMut() -> Result<Snapshot>,
{
    while let Ok(event) = events.recv() {
        debug!("auto-save scheduled by {:?}", event);
        let connected = loop {
            match events.recv_timeout(config.debounce) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => break true,
                Err(RecvTimeoutError::Disconnected) => break false,
            }
        };

        let saved = produce().and_then(|snapshot| write_snapshot(&snapshot, &config.folder, &config.file_name));
        if let Err(e) = saved {
            warn!("auto-save failed: {}", e);
        }

        if !connected {
            break;
        }
    }
    debug!("auto-save stopped");
}

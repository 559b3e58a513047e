//! Persistence for the notification inbox.
//!
//! The store is a dumb serialize/load boundary; ordering and the history
//! cap are enforced by the center, independent of the storage medium.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use crate::domain::StoreError;

use super::notification::Notification;

/// Client-local storage for the notification history.
pub trait NotificationStore: Send + Sync {
    /// Load the persisted history, newest first. An absent history is
    /// an empty one.
    fn load(&self) -> Result<Vec<Notification>, StoreError>;

    /// Replace the persisted history with `notifications`.
    fn save(&self, notifications: &[Notification]) -> Result<(), StoreError>;
}

/// JSON file store, the reload-surviving default.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NotificationStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Notification>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(notifications)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// In-memory store. Serializes through the same JSON contract as the
/// file store so tests exercise the real round trip.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationStore for MemoryStore {
    fn load(&self) -> Result<Vec<Notification>, StoreError> {
        match &*self.snapshot.lock().expect("store lock poisoned") {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(notifications)?;
        *self.snapshot.lock().expect("store lock poisoned") = Some(bytes);
        Ok(())
    }
}

/// Persist, downgrading failure to a warning: a broken store must never
/// take the inbox down with it.
pub(super) fn persist_best_effort(store: &dyn NotificationStore, notifications: &[Notification]) {
    if let Err(e) = store.save(notifications) {
        warn!(error = %e, "failed to persist notification history");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::notification::NotificationLevel;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let history = vec![
            Notification::new("A", "first", NotificationLevel::Info),
            Notification::new("B", "second", NotificationLevel::Error),
        ];
        store.save(&history).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "A");
        assert_eq!(loaded[1].level, NotificationLevel::Error);
    }

    #[test]
    fn file_store_round_trips_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("inbox.json"));

        assert!(store.load().unwrap().is_empty());

        let history = vec![Notification::new("A", "hello", NotificationLevel::Success)];
        store.save(&history).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].message, "hello");
    }
}

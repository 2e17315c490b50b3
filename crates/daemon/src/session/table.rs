// Path → session registry shared by the HTTP and watcher contexts.
//
// Locking: one std mutex guards the map structure and is never held across
// an await. Each entry carries its own async mutex that serializes the
// reload-then-push sequence for that path only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

use super::DocumentSession;

pub(crate) type SessionSlot = Arc<Mutex<DocumentSession>>;

#[derive(Debug, Default)]
pub struct SessionTable {
    entries: StdMutex<HashMap<PathBuf, SessionSlot>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` under its local path, replacing any existing entry.
    /// Returns true if an entry was replaced.
    pub fn register(&self, session: DocumentSession) -> bool {
        let key = session.local_path.clone();
        let slot = Arc::new(Mutex::new(session));
        self.entries.lock().expect("session table lock poisoned").insert(key, slot).is_some()
    }

    /// Snapshot of the session for `path`, if one is registered and its file
    /// still exists.
    pub async fn lookup(&self, path: &Path) -> Option<DocumentSession> {
        let slot = self.slot(path)?;
        let session = slot.lock().await.clone();
        session.local_path.is_file().then_some(session)
    }

    pub(crate) fn slot(&self, path: &Path) -> Option<SessionSlot> {
        self.entries.lock().expect("session table lock poisoned").get(path).cloned()
    }

    /// Drop the entry for `path` only if it is still `slot` (a concurrent
    /// re-register wins).
    pub(crate) fn evict(&self, path: &Path, slot: &SessionSlot) -> bool {
        let mut entries = self.entries.lock().expect("session table lock poisoned");
        match entries.get(path) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                entries.remove(path);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("session table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> =
            self.entries.lock().expect("session table lock poisoned").keys().cloned().collect();
        paths.sort();
        paths
    }
}

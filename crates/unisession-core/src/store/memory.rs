//! In-process session store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::trace;

use crate::Result;
use crate::traits::{SessionStore, StoreChange, StoreKey, StoreOp, StoreSnapshot};

const CHANNEL_CAPACITY: usize = 16;

/// A session store held in memory and shared between handles.
///
/// Each handle behaves like a separate browser tab: handles see the same
/// entries, and a change made through one handle is announced to the
/// subscribers of every other handle.
///
/// # Example
///
/// ```
/// use unisession_core::{MemoryStore, SessionStore, StoreKey};
///
/// let tab_a = MemoryStore::new();
/// let tab_b = tab_a.handle();
///
/// tab_a.set(StoreKey::AccessToken, "token").unwrap();
/// assert_eq!(tab_b.get(StoreKey::AccessToken).unwrap().as_deref(), Some("token"));
/// ```
pub struct MemoryStore {
    shared: Arc<Shared>,
    origin: u64,
    events: broadcast::Sender<StoreChange>,
}

struct Shared {
    entries: RwLock<HashMap<StoreKey, String>>,
    listeners: Mutex<Vec<(u64, broadcast::Sender<StoreChange>)>>,
    next_origin: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store with a single handle.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            entries: RwLock::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
            next_origin: AtomicU64::new(0),
        });
        Self::attach(shared)
    }

    /// Create another handle onto the same entries.
    pub fn handle(&self) -> Self {
        Self::attach(self.shared.clone())
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn attach(shared: Arc<Shared>) -> Self {
        let origin = shared.next_origin.fetch_add(1, Ordering::Relaxed);
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((origin, events.clone()));
        Self {
            shared,
            origin,
            events,
        }
    }

    fn notify_others(&self, change: StoreChange) {
        let listeners = self
            .shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (origin, sender) in listeners.iter() {
            if *origin != self.origin {
                // No receivers is fine
                let _ = sender.send(change);
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(origin, _)| *origin != self.origin);
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>> {
        let entries = self
            .shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&key).cloned())
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        let entries = self
            .shared
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = StoreSnapshot::default();
        for (key, value) in entries.iter() {
            snapshot.insert(*key, value.clone());
        }
        Ok(snapshot)
    }

    fn apply(&self, ops: &[StoreOp]) -> Result<()> {
        let mut changed = Vec::new();
        {
            let mut entries = self
                .shared
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for op in ops {
                let previous = match op {
                    StoreOp::Set(key, value) => entries.insert(*key, value.clone()),
                    StoreOp::Remove(key) => entries.remove(key),
                };
                let current = entries.get(&op.key());
                if previous.as_ref() != current && !changed.contains(&op.key()) {
                    changed.push(op.key());
                }
            }
        }

        trace!(origin = self.origin, ?ops, changed = changed.len(), "Applied store batch");

        match changed.as_slice() {
            [] => {}
            [key] => self.notify_others(StoreChange { key: Some(*key) }),
            _ => self.notify_others(StoreChange { key: None }),
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("origin", &self.origin)
            .field("entries", &self.len())
            .finish()
    }
}

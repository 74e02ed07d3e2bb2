//! Durable session storage trait.

use std::fmt;

use tokio::sync::broadcast;

use crate::Result;

/// The three entries a session occupies in durable storage.
///
/// All three are present or all three are absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    Identity,
}

impl StoreKey {
    /// Every key, in write order.
    pub const ALL: [StoreKey; 3] = [
        StoreKey::AccessToken,
        StoreKey::RefreshToken,
        StoreKey::Identity,
    ];

    /// The name the entry is stored under.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AccessToken => "token",
            StoreKey::RefreshToken => "refreshToken",
            StoreKey::Identity => "user",
        }
    }

    /// Look a key up by its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every session entry, read at one point in time.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub identity: Option<String>,
}

impl StoreSnapshot {
    /// The entry stored under `key`.
    pub fn get(&self, key: StoreKey) -> Option<&str> {
        self.slot(key).as_deref()
    }

    /// Record the entry stored under `key`.
    pub fn insert(&mut self, key: StoreKey, value: String) {
        *self.slot_mut(key) = Some(value);
    }

    /// Whether no entry is present.
    pub fn is_empty(&self) -> bool {
        StoreKey::ALL.into_iter().all(|key| self.get(key).is_none())
    }

    fn slot(&self, key: StoreKey) -> &Option<String> {
        match key {
            StoreKey::AccessToken => &self.access_token,
            StoreKey::RefreshToken => &self.refresh_token,
            StoreKey::Identity => &self.identity,
        }
    }

    fn slot_mut(&mut self, key: StoreKey) -> &mut Option<String> {
        match key {
            StoreKey::AccessToken => &mut self.access_token,
            StoreKey::RefreshToken => &mut self.refresh_token,
            StoreKey::Identity => &mut self.identity,
        }
    }
}

// Values are credentials
impl fmt::Debug for StoreSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<&str> = StoreKey::ALL
            .into_iter()
            .filter(|key| self.get(*key).is_some())
            .map(|key| key.as_str())
            .collect();
        f.debug_struct("StoreSnapshot").field("present", &present).finish()
    }
}

/// A single mutation applied as part of a batch.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set(StoreKey, String),
    Remove(StoreKey),
}

impl StoreOp {
    pub fn key(&self) -> StoreKey {
        match self {
            StoreOp::Set(key, _) | StoreOp::Remove(key) => *key,
        }
    }
}

// Values are credentials
impl fmt::Debug for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::Set(key, _) => write!(f, "Set({})", key),
            StoreOp::Remove(key) => write!(f, "Remove({})", key),
        }
    }
}

/// Notification that another writer changed the store.
///
/// `key` is `None` when the writer changed several entries at once or the
/// store cannot tell which entry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub key: Option<StoreKey>,
}

/// A durable key-value mirror of the session shared by every process of the
/// same user.
///
/// Implementations must make each [`apply`](SessionStore::apply) batch
/// atomic for readers, and must not deliver change notifications to the
/// handle that made the change.
pub trait SessionStore: Send + Sync {
    /// Read one entry.
    fn get(&self, key: StoreKey) -> Result<Option<String>>;

    /// Apply a batch of mutations atomically.
    fn apply(&self, ops: &[StoreOp]) -> Result<()>;

    /// Subscribe to changes made by other writers.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    /// Write one entry.
    fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        self.apply(&[StoreOp::Set(key, value.to_string())])
    }

    /// Remove one entry. Removing a missing entry is not an error.
    fn remove(&self, key: StoreKey) -> Result<()> {
        self.apply(&[StoreOp::Remove(key)])
    }

    /// Read every entry at once.
    ///
    /// Stores that can read all entries atomically should override this so
    /// a concurrent batch is never observed half-applied.
    fn snapshot(&self) -> Result<StoreSnapshot> {
        let mut snapshot = StoreSnapshot::default();
        for key in StoreKey::ALL {
            if let Some(value) = self.get(key)? {
                snapshot.insert(key, value);
            }
        }
        Ok(snapshot)
    }

    /// Whether no session entry is stored.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.snapshot()?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_dashboard_storage_names() {
        assert_eq!(StoreKey::AccessToken.as_str(), "token");
        assert_eq!(StoreKey::RefreshToken.as_str(), "refreshToken");
        assert_eq!(StoreKey::Identity.as_str(), "user");
        assert_eq!(StoreKey::from_name("user"), Some(StoreKey::Identity));
        assert_eq!(StoreKey::from_name("theme"), None);
    }

    #[test]
    fn store_op_hides_values_in_debug() {
        let op = StoreOp::Set(StoreKey::RefreshToken, "secret-refresh".to_string());
        assert_eq!(format!("{:?}", op), "Set(refreshToken)");
        assert_eq!(op.key(), StoreKey::RefreshToken);
    }

    #[test]
    fn snapshot_tracks_entries_and_hides_values() {
        let mut snapshot = StoreSnapshot::default();
        assert!(snapshot.is_empty());

        snapshot.insert(StoreKey::RefreshToken, "secret-refresh".to_string());
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.get(StoreKey::RefreshToken), Some("secret-refresh"));
        assert_eq!(snapshot.get(StoreKey::AccessToken), None);
        assert_eq!(
            format!("{:?}", snapshot),
            r#"StoreSnapshot { present: ["refreshToken"] }"#
        );
    }
}

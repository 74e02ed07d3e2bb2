//! JSON file storage for the session entries.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use fs2::FileExt;
use notify::RecommendedWatcher;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use uuid::Uuid;

use unisession_core::Result;
use unisession_core::error::StorageError;
use unisession_core::traits::{SessionStore, StoreChange, StoreKey, StoreOp, StoreSnapshot};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::watch;

/// File holding the session entries.
pub(crate) const SESSION_FILE: &str = "session.json";

/// Lock file serializing writers.
const LOCK_FILE: &str = "session.lock";

const CHANNEL_CAPACITY: usize = 16;

/// A session store kept in `session.json` inside a directory.
///
/// Writers serialize on an exclusive lock of `session.lock`, write a uniquely
/// named temp file and rename it over `session.json`, so readers never see a
/// half-written batch. Removing every entry deletes the file.
///
/// A store opened with [`open_watched`](Self::open_watched) announces changes
/// made by other processes (or other handles in this process) to its
/// subscribers. Its own writes are never announced back to it.
pub struct FileSessionStore {
    dir: PathBuf,
    last_seen: Arc<Mutex<Option<String>>>,
    events: broadcast::Sender<StoreChange>,
    watcher: Option<Mutex<RecommendedWatcher>>,
}

impl FileSessionStore {
    /// Open a store without change notifications.
    ///
    /// Suitable for one-shot use where no other writer needs to be followed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(StorageError::from)?;

        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let initial = read_raw(&dir.join(SESSION_FILE))?;

        Ok(Self {
            dir,
            last_seen: Arc::new(Mutex::new(initial)),
            events,
            watcher: None,
        })
    }

    /// Open a store that watches its directory for changes by other writers.
    pub fn open_watched(dir: impl AsRef<Path>) -> Result<Self> {
        let mut store = Self::open(dir)?;
        let watcher = watch::watch_session_file(
            &store.dir,
            store.session_path(),
            store.last_seen.clone(),
            store.events.clone(),
        )?;
        store.watcher = Some(Mutex::new(watcher));
        Ok(store)
    }

    /// The directory this store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether this store follows changes by other writers.
    pub fn is_watched(&self) -> bool {
        self.watcher.is_some()
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        match read_raw(&self.session_path())? {
            Some(content) => parse_entries(&content),
            None => Ok(Map::new()),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<Option<String>> {
        let path = self.session_path();

        if entries.is_empty() {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::from(e).into()),
            }
            return Ok(None);
        }

        let content = serde_json::to_string_pretty(entries).map_err(|e| StorageError::Corrupt {
            message: e.to_string(),
        })?;

        let temp_path = self.dir.join(format!(".{}.{}.tmp", SESSION_FILE, Uuid::new_v4()));
        fs::write(&temp_path, &content).map_err(StorageError::from)?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&temp_path)
                .map_err(StorageError::from)?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms).map_err(StorageError::from)?;
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::from(e).into());
        }

        Ok(Some(content))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(key.as_str())
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        let mut snapshot = StoreSnapshot::default();
        for (name, value) in self.read_entries()? {
            match (StoreKey::from_name(&name), value) {
                (Some(key), Value::String(value)) => snapshot.insert(key, value),
                (Some(key), _) => debug!(%key, "Ignoring non-string session entry"),
                (None, _) => debug!(%name, "Ignoring unknown session entry"),
            }
        }
        Ok(snapshot)
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn apply(&self, ops: &[StoreOp]) -> Result<()> {
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path())
            .map_err(StorageError::from)?;

        lock_file.lock_exclusive().map_err(StorageError::from)?;

        let result = (|| -> Result<()> {
            let mut entries = self.read_entries()?;
            for op in ops {
                match op {
                    StoreOp::Set(key, value) => {
                        entries.insert(key.as_str().to_string(), Value::String(value.clone()));
                    }
                    StoreOp::Remove(key) => {
                        entries.remove(key.as_str());
                    }
                }
            }

            // Record the content before it lands so the watcher skips our own write
            let mut last_seen = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = last_seen.clone();
            match self.write_entries(&entries) {
                Ok(content) => {
                    *last_seen = content;
                    Ok(())
                }
                Err(e) => {
                    *last_seen = previous;
                    Err(e)
                }
            }
        })();

        lock_file.unlock().map_err(StorageError::from)?;

        if result.is_ok() {
            debug!(ops = ops.len(), "Wrote session file");
        }
        result
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for FileSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSessionStore")
            .field("dir", &self.dir)
            .field("watched", &self.is_watched())
            .finish()
    }
}

/// Read the session file, treating a missing file as empty.
pub(crate) fn read_raw(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::from(e).into()),
    }
}

pub(crate) fn parse_entries(content: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(content).map_err(|e| {
        StorageError::Corrupt {
            message: format!("{}: {}", SESSION_FILE, e),
        }
        .into()
    })
}

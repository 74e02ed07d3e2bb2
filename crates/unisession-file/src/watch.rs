//! Change notifications for writes made by other handles.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use unisession_core::Result;
use unisession_core::error::StorageError;
use unisession_core::traits::{StoreChange, StoreKey};

use crate::store::{SESSION_FILE, parse_entries, read_raw};

/// Watch `dir` and announce every change of the session file that this
/// handle did not write itself.
pub(crate) fn watch_session_file(
    dir: &Path,
    session_path: PathBuf,
    last_seen: Arc<Mutex<Option<String>>>,
    events: broadcast::Sender<StoreChange>,
) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else {
            return;
        };

        if !matches!(
            event.kind,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
        ) {
            return;
        }

        let is_session_file = event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == SESSION_FILE));

        if !is_session_file {
            return;
        }

        if let Some(change) = detect_change(&session_path, &last_seen) {
            // No receivers is fine; nobody is listening yet.
            let _ = events.send(change);
        }
    })
    .map_err(|e| StorageError::Watch {
        message: format!("Failed to create file watcher: {}", e),
    })?;

    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(|e| StorageError::Watch {
            message: format!("Failed to watch {}: {}", dir.display(), e),
        })?;

    debug!(dir = %dir.display(), "Watching session directory");
    Ok(watcher)
}

/// Compare the file against the last content this handle knows about.
///
/// Records the new content and returns the change when they differ.
pub(crate) fn detect_change(
    session_path: &Path,
    last_seen: &Mutex<Option<String>>,
) -> Option<StoreChange> {
    let current = match read_raw(session_path) {
        Ok(current) => current,
        Err(e) => {
            debug!(error = %e, "Skipping unreadable session file");
            return None;
        }
    };

    let mut last_seen = last_seen.lock().unwrap_or_else(PoisonError::into_inner);
    if *last_seen == current {
        trace!("Session file unchanged");
        return None;
    }

    let previous = std::mem::replace(&mut *last_seen, current.clone());
    Some(StoreChange {
        key: changed_key(previous.as_deref(), current.as_deref()),
    })
}

/// The single key that differs between two file contents, if exactly one does.
fn changed_key(previous: Option<&str>, current: Option<&str>) -> Option<StoreKey> {
    let previous = entries(previous)?;
    let current = entries(current)?;

    let mut changed = StoreKey::ALL
        .into_iter()
        .filter(|key| previous.get(key.as_str()) != current.get(key.as_str()));

    match (changed.next(), changed.next()) {
        (Some(key), None) => Some(key),
        _ => None,
    }
}

fn entries(content: Option<&str>) -> Option<Map<String, Value>> {
    match content {
        Some(content) => parse_entries(content).ok(),
        None => Some(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use unisession_core::SessionStore;

    use crate::FileSessionStore;

    #[test]
    fn own_content_is_not_a_change() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SESSION_FILE);
        fs::write(&path, r#"{"token":"a"}"#).unwrap();

        let last_seen = Mutex::new(Some(r#"{"token":"a"}"#.to_string()));
        assert!(detect_change(&path, &last_seen).is_none());
    }

    #[test]
    fn single_key_change_is_named() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SESSION_FILE);
        fs::write(&path, r#"{"token":"b","refreshToken":"r"}"#).unwrap();

        let last_seen = Mutex::new(Some(r#"{"token":"a","refreshToken":"r"}"#.to_string()));
        let change = detect_change(&path, &last_seen).unwrap();
        assert_eq!(change.key, Some(StoreKey::AccessToken));

        // The new content is now known
        assert!(detect_change(&path, &last_seen).is_none());
    }

    #[test]
    fn deleted_file_changes_every_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SESSION_FILE);

        let last_seen = Mutex::new(Some(
            r#"{"token":"a","refreshToken":"r","user":"{}"}"#.to_string(),
        ));
        let change = detect_change(&path, &last_seen).unwrap();
        assert_eq!(change.key, None);
        assert_eq!(*last_seen.lock().unwrap(), None);
    }

    #[test]
    fn changed_key_requires_parseable_content() {
        assert_eq!(changed_key(Some("garbage"), Some(r#"{"token":"a"}"#)), None);
        assert_eq!(
            changed_key(None, Some(r#"{"user":"{}"}"#)),
            Some(StoreKey::Identity)
        );
    }

    #[tokio::test]
    async fn other_handle_writes_are_announced() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FileSessionStore::open_watched(temp_dir.path()).unwrap();
        let reader = FileSessionStore::open_watched(temp_dir.path()).unwrap();

        let mut writer_rx = writer.subscribe();
        let mut reader_rx = reader.subscribe();

        writer.set(StoreKey::AccessToken, "fresh").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), reader_rx.recv())
            .await
            .expect("watcher should report the write")
            .unwrap();
        assert_eq!(change.key, Some(StoreKey::AccessToken));
        assert_eq!(
            reader.get(StoreKey::AccessToken).unwrap().as_deref(),
            Some("fresh")
        );

        let own = tokio::time::timeout(Duration::from_millis(300), writer_rx.recv()).await;
        assert!(own.is_err(), "writer must not hear its own write");
    }
}

//! The session manager.
//!
//! [`SessionManager`] owns the in-memory session, keeps the durable
//! [`SessionStore`] in step with it and renews the access token shortly
//! before it expires. None of its operations return errors: every failure is
//! logged and left for the HTTP client's reactive 401 path to resolve.
//!
//! Lifecycle:
//!
//! ```text
//! NoSession --login--> Authenticated --renew--> Authenticated' --logout--> NoSession
//! ```
//!
//! Renewal is fire-and-forget. Until the new token lands the session stays
//! authenticated with the old one.

use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SessionConfig;
use crate::identity::Identity;
use crate::renewal::{RenewalTimer, renewal_delay};
use crate::session::Session;
use crate::tokens::{AccessToken, RefreshToken};
use crate::traits::{SessionStore, StoreKey, StoreOp, TokenRefresher};

const EVENT_CAPACITY: usize = 32;

/// Notification delivered to [`SessionManager::subscribe`] receivers.
///
/// Every event is sent after the store has been updated, so a subscriber
/// reading the store in response always sees the new state.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new session was established by [`SessionManager::login`].
    LoggedIn(Session),
    /// The access token was renewed by this manager.
    Renewed(Session),
    /// The session was destroyed by [`SessionManager::logout`].
    LoggedOut,
    /// In-memory state was re-synchronized after another writer changed the store.
    Synced(Option<Session>),
}

/// Result of a renewal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// New tokens were stored and the session updated.
    Renewed,
    /// There was no refresh token to renew with.
    NoSession,
    /// The backend or the store failed; nothing was changed.
    Failed,
}

/// Owns the authenticated session for one process.
///
/// Cheap to clone; clones share the same state.
///
/// A `SessionManager` arms Tokio timers and spawns a store listener, so it
/// must be created and used from within a Tokio runtime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    store: Arc<dyn SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    config: SessionConfig,
    state: RwLock<Option<Session>>,
    timer: RenewalTimer,
    events: broadcast::Sender<SessionEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
    }
}

impl SessionManager {
    /// Create a manager, restore any session already in the store and start
    /// listening for changes made by other writers.
    pub fn new(
        store: Arc<dyn SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut changes = store.subscribe();

        let manager = Self {
            inner: Arc::new(ManagerInner {
                store,
                refresher,
                config,
                state: RwLock::new(None),
                timer: RenewalTimer::new(),
                events,
                listener: Mutex::new(None),
            }),
        };

        if manager.sync_from_store() {
            info!("Restored session from store");
        }

        let weak = Arc::downgrade(&manager.inner);
        let listener = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => debug!(key = ?change.key, "Store changed by another writer"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Store change notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = SessionManager { inner };
                if manager.sync_from_store() {
                    manager.emit(SessionEvent::Synced(manager.current_session()));
                }
            }
        });

        *manager
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);

        manager
    }

    /// Establish a new session, superseding any previous one.
    ///
    /// The store is written before in-memory state changes.
    #[instrument(skip_all, fields(user = %identity.id))]
    pub fn login(&self, access_token: AccessToken, refresh_token: RefreshToken, identity: Identity) {
        match identity.to_json() {
            Ok(identity_json) => {
                let ops = [
                    StoreOp::Set(StoreKey::AccessToken, access_token.as_str().to_string()),
                    StoreOp::Set(StoreKey::RefreshToken, refresh_token.as_str().to_string()),
                    StoreOp::Set(StoreKey::Identity, identity_json),
                ];
                if let Err(e) = self.inner.store.apply(&ops) {
                    error!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize identity; session not persisted"),
        }

        let session = Session::new(access_token, refresh_token, identity);
        self.replace_state(Some(session.clone()));
        self.schedule_renewal(session.access_token());

        info!("Logged in");
        self.emit(SessionEvent::LoggedIn(session));
    }

    /// Destroy the session. Calling this without a session is a no-op.
    #[instrument(skip_all)]
    pub fn logout(&self) {
        self.inner.timer.cancel();
        let previous = self.replace_state(None);

        let ops = StoreKey::ALL.map(StoreOp::Remove);
        if let Err(e) = self.inner.store.apply(&ops) {
            error!(error = %e, "Failed to clear stored session");
        }

        if previous.is_some() {
            info!("Logged out");
            self.emit(SessionEvent::LoggedOut);
        } else {
            debug!("Logout without an active session");
        }
    }

    /// The in-memory session, if any.
    pub fn current_session(&self) -> Option<Session> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an access token is held in memory.
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Whether a renewal timer is currently armed.
    pub fn has_pending_renewal(&self) -> bool {
        self.inner.timer.is_armed()
    }

    /// Disarm the renewal timer without touching the session.
    ///
    /// The next login, renewal or store change arms it again. Returns `true`
    /// if a timer was pending.
    pub fn cancel_renewal(&self) -> bool {
        self.inner.timer.cancel()
    }

    /// The configuration this manager was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Arm the renewal timer for `access_token`.
    ///
    /// Returns the delay that was armed. A token already inside the lead
    /// window is renewed immediately (delay zero). A token whose expiry cannot
    /// be decoded is logged and gets no timer; it will expire and be caught by
    /// the HTTP client's reactive refresh.
    pub fn schedule_renewal(&self, access_token: &AccessToken) -> Option<Duration> {
        let expiry = match access_token.expires_at() {
            Ok(expiry) => expiry,
            Err(e) => {
                warn!(error = %e, "Cannot decode access token expiry; renewal not scheduled");
                self.inner.timer.cancel();
                return None;
            }
        };

        let delay = renewal_delay(expiry, Utc::now(), self.inner.config.lead_time);
        if delay.is_zero() {
            info!("Access token near expiry, renewing immediately");
        } else {
            info!(seconds = delay.as_secs(), "Token renewal scheduled");
        }

        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        self.inner.timer.arm(access_token, delay, async move {
            if let Some(inner) = weak.upgrade() {
                SessionManager { inner }.renew().await;
            }
        });

        Some(delay)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// The refresh token is read from the store rather than from memory so
    /// that a token rotated by another writer is picked up. On success the
    /// store is updated first, then in-memory state, then subscribers are
    /// notified. On failure nothing changes and the session is kept.
    #[instrument(skip_all)]
    pub async fn renew(&self) -> RenewOutcome {
        let refresh_token = match self.inner.store.get(StoreKey::RefreshToken) {
            Ok(Some(token)) => RefreshToken::new(token),
            Ok(None) => {
                debug!("No refresh token stored; nothing to renew");
                return RenewOutcome::NoSession;
            }
            Err(e) => {
                error!(error = %e, "Failed to read refresh token");
                return RenewOutcome::Failed;
            }
        };

        let tokens = match self.inner.refresher.refresh(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(error = %e, "Proactive renewal failed");
                return RenewOutcome::Failed;
            }
        };

        // The session may have been destroyed or superseded while the request was in flight
        match self.inner.store.get(StoreKey::RefreshToken) {
            Ok(Some(stored)) if stored == refresh_token.as_str() => {}
            Ok(Some(_)) => {
                info!("Session replaced during renewal; discarding new tokens");
                return RenewOutcome::NoSession;
            }
            Ok(None) => {
                info!("Session ended during renewal; discarding new tokens");
                return RenewOutcome::NoSession;
            }
            Err(e) => {
                error!(error = %e, "Failed to read refresh token");
                return RenewOutcome::Failed;
            }
        }

        let mut ops = vec![StoreOp::Set(
            StoreKey::AccessToken,
            tokens.access_token.as_str().to_string(),
        )];
        if let Some(rotated) = &tokens.refresh_token {
            ops.push(StoreOp::Set(StoreKey::RefreshToken, rotated.as_str().to_string()));
        }
        if let Err(e) = self.inner.store.apply(&ops) {
            error!(error = %e, "Failed to persist renewed tokens");
            return RenewOutcome::Failed;
        }

        self.sync_from_store();
        info!(rotated = tokens.refresh_token.is_some(), "Access token renewed");

        match self.current_session() {
            Some(session) => self.emit(SessionEvent::Renewed(session)),
            None => warn!("Renewed tokens stored but no identity is cached"),
        }
        RenewOutcome::Renewed
    }

    /// Re-synchronize in-memory state from the store.
    ///
    /// Returns `true` if the in-memory session changed. A store with none of
    /// the session entries clears the session; a store holding only some of
    /// them updates just those fields of an existing session. The renewal
    /// timer follows the access token.
    pub fn sync_from_store(&self) -> bool {
        let stored = match self.inner.store.snapshot() {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "Failed to read session store");
                return false;
            }
        };

        let current = self.current_session();
        let next = match (stored.access_token, stored.refresh_token, stored.identity) {
            (None, None, None) => None,
            (access, refresh, identity_json) => {
                let identity = identity_json.and_then(|json| match Identity::from_json(&json) {
                    Ok(identity) => Some(identity),
                    Err(e) => {
                        warn!(error = %e, "Ignoring unreadable stored identity");
                        None
                    }
                });

                let access = access
                    .map(AccessToken::new)
                    .or_else(|| current.as_ref().map(|s| s.access_token().clone()));
                let refresh = refresh
                    .map(RefreshToken::new)
                    .or_else(|| current.as_ref().map(|s| s.refresh_token().clone()));
                let identity = identity.or_else(|| current.as_ref().map(|s| s.identity().clone()));

                match (access, refresh, identity) {
                    (Some(access), Some(refresh), Some(identity)) => {
                        Some(Session::new(access, refresh, identity))
                    }
                    _ => {
                        debug!("Store holds a partial session; keeping in-memory state");
                        current.clone()
                    }
                }
            }
        };

        if next == current {
            return false;
        }

        let access_changed = next.as_ref().map(Session::access_token)
            != current.as_ref().map(Session::access_token);
        self.replace_state(next.clone());

        match next {
            Some(session) if access_changed => {
                self.schedule_renewal(session.access_token());
            }
            Some(_) => {}
            None => {
                self.inner.timer.cancel();
                info!("Session cleared by another writer");
            }
        }
        true
    }

    fn replace_state(&self, session: Option<Session>) -> Option<Session> {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *state, session)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.current_session())
            .field("timer", &self.inner.timer)
            .field("config", &self.inner.config)
            .finish()
    }
}

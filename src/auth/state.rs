//! Process-wide session record
//!
//! `SessionState` is the single source of truth for "is a user logged in".
//! It is shared (behind an `Arc`) by the session store, the API gateway and
//! any presentation layer. Every transition writes durable storage before the
//! in-memory record changes, under the same lock readers take, so a reader
//! never observes a state that storage does not yet reflect.

use crate::api::types::User;
use crate::auth::storage::{CredentialStore, StoredCredentials};
use crate::core::error::AuthError;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    LoggingOut,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user: Option<User>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub status: SessionStatus,
    /// Last user-visible authentication error
    pub error: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Session transitions, broadcast to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Authenticating,
    SignedIn { user: User },
    SignInFailed { message: String },
    LoggingOut,
    SignedOut,
    /// The server rejected the stored token
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Settled,
    Authenticating,
    LoggingOut,
}

struct Inner {
    phase: Phase,
    /// Id of the latest sign-in attempt; a stale id cannot settle the session
    attempt: u64,
    credentials: Option<StoredCredentials>,
    error: Option<String>,
}

pub struct SessionState {
    inner: RwLock<Inner>,
    storage: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
    /// Bumped whenever the credentials change identity
    epoch: AtomicU64,
}

impl SessionState {
    /// Create an anonymous session backed by `storage`. Call
    /// [`restore_from_storage`](Self::restore_from_storage) once at startup.
    pub fn new(storage: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(Inner {
                phase: Phase::Settled,
                attempt: 0,
                credentials: None,
                error: None,
            }),
            storage,
            events,
            epoch: AtomicU64::new(0),
        }
    }

    /// Rebuild the session from persisted storage without contacting the
    /// server. A stored token is trusted optimistically; the first
    /// authorized request validates it.
    pub fn restore_from_storage(&self) -> Session {
        let mut inner = self.inner.write();

        let restored = match self.storage.load() {
            Ok(found) => found,
            Err(e) => {
                warn!("Discarding unreadable session record: {}", e);
                if let Err(e) = self.storage.clear() {
                    warn!("Failed to clear session record: {}", e);
                }
                None
            }
        };

        match &restored {
            Some(creds) => info!(email = %creds.user.email, "Restored session from storage"),
            None => debug!("No persisted session"),
        }

        inner.phase = Phase::Settled;
        inner.credentials = restored;
        inner.error = None;
        self.epoch.fetch_add(1, Ordering::SeqCst);

        Self::build_snapshot(&inner)
    }

    /// Consistent snapshot of the current session
    pub fn snapshot(&self) -> Session {
        Self::build_snapshot(&self.inner.read())
    }

    pub fn status(&self) -> SessionStatus {
        Self::status_of(&self.inner.read())
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Token to attach to the next outbound request
    pub fn bearer_token(&self) -> Option<String> {
        self.inner
            .read()
            .credentials
            .as_ref()
            .map(|c| c.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read().credentials.as_ref().map(|c| c.user.clone())
    }

    /// Changes whenever the signed-in identity changes (sign-in, sign-out,
    /// expiry, restore). Caches keyed per user compare against it.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn clear_error(&self) {
        self.inner.write().error = None;
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Anonymous -> Authenticating. Returns the attempt id the outcome must
    /// be reported with.
    pub(crate) fn begin_authentication(&self) -> Result<u64, AuthError> {
        let mut inner = self.inner.write();
        if inner.phase != Phase::Settled {
            return Err(AuthError::Busy);
        }
        if let Some(creds) = &inner.credentials {
            return Err(AuthError::AlreadySignedIn {
                email: creds.user.email.clone(),
            });
        }

        inner.phase = Phase::Authenticating;
        inner.attempt += 1;
        inner.error = None;
        let attempt = inner.attempt;
        drop(inner);

        self.emit(SessionEvent::Authenticating);
        Ok(attempt)
    }

    fn is_current_attempt(inner: &Inner, attempt: u64) -> bool {
        inner.phase == Phase::Authenticating && inner.attempt == attempt
    }

    /// Authenticating -> Authenticated
    pub(crate) fn complete_authentication(
        &self,
        attempt: u64,
        credentials: StoredCredentials,
    ) -> Result<Session, AuthError> {
        let mut inner = self.inner.write();
        if !Self::is_current_attempt(&inner, attempt) {
            debug!(attempt, "Sign-in finished after it was cancelled, discarding");
            return Err(AuthError::Cancelled);
        }

        if let Err(e) = self.storage.save(&credentials) {
            let err = AuthError::Storage(e.to_string());
            inner.phase = Phase::Settled;
            inner.error = Some(err.user_message());
            drop(inner);
            self.emit(SessionEvent::SignInFailed {
                message: err.user_message(),
            });
            return Err(err);
        }

        let user = credentials.user.clone();
        inner.phase = Phase::Settled;
        inner.credentials = Some(credentials);
        inner.error = None;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let session = Self::build_snapshot(&inner);
        drop(inner);

        info!(email = %user.email, "Signed in");
        self.emit(SessionEvent::SignedIn { user });
        Ok(session)
    }

    /// Authenticating -> Anonymous, keeping the message for the UI. A no-op
    /// once `attempt` has been superseded or cancelled.
    pub(crate) fn fail_authentication(&self, attempt: u64, err: &AuthError) -> Session {
        let mut inner = self.inner.write();
        if !Self::is_current_attempt(&inner, attempt) {
            return Self::build_snapshot(&inner);
        }
        inner.phase = Phase::Settled;
        inner.error = Some(err.user_message());
        let session = Self::build_snapshot(&inner);
        drop(inner);

        debug!("Authentication failed: {}", err);
        self.emit(SessionEvent::SignInFailed {
            message: err.user_message(),
        });
        session
    }

    /// Any state -> LoggingOut. Local credentials are cleared right away;
    /// the returned token is what the remote invalidation call should carry.
    /// A sign-in still in flight is cancelled and can no longer complete.
    pub(crate) fn begin_logout(&self) -> Option<String> {
        let mut inner = self.inner.write();
        if inner.phase == Phase::Authenticating {
            debug!(attempt = inner.attempt, "Cancelling sign-in in progress");
            inner.attempt += 1;
        }

        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear persisted session: {}", e);
        }
        let token = inner.credentials.take().map(|c| c.token);
        inner.phase = Phase::LoggingOut;
        inner.error = None;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        drop(inner);

        self.emit(SessionEvent::LoggingOut);
        token
    }

    /// LoggingOut -> Anonymous
    pub(crate) fn finish_logout(&self) {
        let mut inner = self.inner.write();
        if inner.phase != Phase::LoggingOut {
            return;
        }
        inner.phase = Phase::Settled;
        drop(inner);

        info!("Signed out");
        self.emit(SessionEvent::SignedOut);
    }

    /// Forced expiry after the server rejected `token_used`.
    ///
    /// Returns `false` when the session has moved on since the request was
    /// built (a newer sign-in must not be undone by a stale 401).
    pub(crate) fn force_expire(&self, token_used: Option<&str>) -> bool {
        let mut inner = self.inner.write();
        let current = inner.credentials.as_ref().map(|c| c.token.as_str());
        if current != token_used {
            debug!("Ignoring 401 for a superseded token");
            return false;
        }
        if current.is_none() {
            return true;
        }

        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear persisted session: {}", e);
        }
        inner.credentials = None;
        inner.phase = Phase::Settled;
        inner.error = Some(AuthError::SessionExpired.user_message());
        self.epoch.fetch_add(1, Ordering::SeqCst);
        drop(inner);

        warn!("Session expired, credentials cleared");
        self.emit(SessionEvent::Expired);
        true
    }

    fn emit(&self, event: SessionEvent) {
        // send() fails only when nobody is listening
        let _ = self.events.send(event);
    }

    fn status_of(inner: &Inner) -> SessionStatus {
        match (inner.phase, &inner.credentials) {
            (Phase::Authenticating, _) => SessionStatus::Authenticating,
            (Phase::LoggingOut, _) => SessionStatus::LoggingOut,
            (Phase::Settled, Some(_)) => SessionStatus::Authenticated,
            (Phase::Settled, None) => SessionStatus::Anonymous,
        }
    }

    fn build_snapshot(inner: &Inner) -> Session {
        Session {
            user: inner.credentials.as_ref().map(|c| c.user.clone()),
            token: inner.credentials.as_ref().map(|c| c.token.clone()),
            status: Self::status_of(inner),
            error: inner.error.clone(),
        }
    }
}

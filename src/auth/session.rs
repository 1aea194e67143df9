//! Sign-in, sign-up and sign-out flows on top of [`SessionState`]

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::ApiGateway;
use crate::auth::state::{Session, SessionEvent, SessionState};
use crate::auth::storage::StoredCredentials;
use crate::auth::validate;
use crate::core::error::{
    AuthError, FetchError, INVALID_CREDENTIALS_MESSAGE, SIGN_UP_FAILED_MESSAGE,
};

const DUPLICATE_ACCOUNT_MESSAGE: &str = "An account with this email already exists.";
const UNREACHABLE_MESSAGE: &str = "Unable to reach the server. Please try again.";

/// Authentication entry point used by the presentation layer
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<SessionState>,
    api: ApiGateway,
}

impl SessionStore {
    /// Bind to the gateway and the session record it already shares
    pub fn new(api: ApiGateway) -> Self {
        Self {
            state: Arc::clone(api.session()),
            api,
        }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.api
    }

    /// Run once at startup
    pub fn restore_from_storage(&self) -> Session {
        self.state.restore_from_storage()
    }

    pub fn snapshot(&self) -> Session {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.state.subscribe()
    }

    /// Validate, log in, persist. On failure nothing is persisted and the
    /// session is left anonymous with the error message attached. Dropping
    /// the returned future before it resolves cancels the attempt.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate::sign_in(email, password)?;
        let attempt = self.state.begin_authentication()?;
        let guard = FlowGuard::new(&self.state, Flow::SignIn(attempt));

        let result = self.authenticate(email, password).await;
        guard.disarm();
        self.settle_attempt(attempt, result)
    }

    /// Register, then sign in with the same credentials. Either step failing
    /// yields one error; only a completed sign-in persists anything.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        validate::sign_up(name, email, password)?;
        let attempt = self.state.begin_authentication()?;
        let guard = FlowGuard::new(&self.state, Flow::SignIn(attempt));

        let result = async {
            self.api
                .register(name.trim(), email, password)
                .await
                .map_err(register_error)?;
            info!(email, "Account registered");
            self.authenticate(email, password).await
        }
        .await;
        guard.disarm();
        self.settle_attempt(attempt, result)
    }

    /// Local credentials are cleared no matter what the server says. A
    /// sign-in still in flight is cancelled. If this future is dropped
    /// during the remote call the session still ends up anonymous.
    pub async fn sign_out(&self) {
        let token = self.state.begin_logout();
        let guard = FlowGuard::new(&self.state, Flow::SignOut);

        if token.is_some() {
            if let Err(e) = self.api.logout(token).await {
                warn!("Remote logout failed (ignored): {}", e);
            }
        }

        guard.disarm();
        self.state.finish_logout();
    }

    fn settle_attempt(
        &self,
        attempt: u64,
        result: Result<StoredCredentials, AuthError>,
    ) -> Result<Session, AuthError> {
        match result {
            Ok(credentials) => self.state.complete_authentication(attempt, credentials),
            Err(err) => {
                self.state.fail_authentication(attempt, &err);
                Err(err)
            }
        }
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<StoredCredentials, AuthError> {
        let response = self
            .api
            .login(email, password)
            .await
            .map_err(login_error)?;

        match response.into_parts() {
            (Some(user), Some(token)) => Ok(StoredCredentials { token, user }),
            _ => Err(AuthError::Request {
                message: INVALID_CREDENTIALS_MESSAGE.to_string(),
                source: FetchError::Decode("login response without user or accessToken".into()),
            }),
        }
    }
}

// =============================================================================
// CANCELLATION
// =============================================================================

enum Flow {
    SignIn(u64),
    SignOut,
}

/// Settles the session when a flow's future is dropped at an `.await`
struct FlowGuard<'a> {
    state: &'a SessionState,
    flow: Flow,
    armed: bool,
}

impl<'a> FlowGuard<'a> {
    fn new(state: &'a SessionState, flow: Flow) -> Self {
        Self {
            state,
            flow,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.flow {
            Flow::SignIn(attempt) => {
                debug!(attempt, "Sign-in dropped before completion");
                self.state.fail_authentication(attempt, &AuthError::Cancelled);
            }
            Flow::SignOut => {
                debug!("Sign-out dropped during remote logout");
                self.state.finish_logout();
            }
        }
    }
}

fn login_error(err: FetchError) -> AuthError {
    let message = err
        .server_message()
        .map(str::to_string)
        .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string());

    match err.status() {
        Some(400..=499) => AuthError::InvalidCredentials(message),
        Some(_) => AuthError::Request {
            message,
            source: err,
        },
        None => AuthError::Request {
            message: UNREACHABLE_MESSAGE.to_string(),
            source: err,
        },
    }
}

fn register_error(err: FetchError) -> AuthError {
    match err.status() {
        Some(409) => AuthError::DuplicateAccount(
            err.server_message()
                .unwrap_or(DUPLICATE_ACCOUNT_MESSAGE)
                .to_string(),
        ),
        Some(_) => AuthError::Request {
            message: err
                .server_message()
                .unwrap_or(SIGN_UP_FAILED_MESSAGE)
                .to_string(),
            source: err,
        },
        None => AuthError::Request {
            message: UNREACHABLE_MESSAGE.to_string(),
            source: err,
        },
    }
}

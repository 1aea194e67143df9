//! Error types for finboard

use thiserror::Error;

/// Result type alias using finboard's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Default message shown when the login endpoint rejects credentials
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password. Please try again.";

/// Default message shown when registration fails without a server message
pub const SIGN_UP_FAILED_MESSAGE: &str = "Sign up failed. Please try again.";

/// finboard error types
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Authentication failures surfaced to the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    DuplicateAccount(String),

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    #[error("Already signed in as {email}")]
    AlreadySignedIn { email: String },

    #[error("Another authentication request is in progress")]
    Busy,

    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Request { message: String, source: FetchError },

    #[error("Could not persist session: {0}")]
    Storage(String),
}

impl AuthError {
    /// Message suitable for a toast or inline form error
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Failures of a single remote read, shared by every coalesced caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unauthorized")]
    Unauthorized { message: Option<String> },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// HTTP status carried by this error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Unauthorized { .. } => Some(401),
            FetchError::Server { status, .. } => Some(*status),
            FetchError::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Message body returned by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            FetchError::Unauthorized { message } => message.as_deref(),
            FetchError::Server { message, .. } if !message.is_empty() => Some(message),
            FetchError::Exhausted { last, .. } => last.server_message(),
            _ => None,
        }
    }

    /// The error that ended a retry sequence
    pub fn root(&self) -> &FetchError {
        match self {
            FetchError::Exhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// 401s and cancellations are not worth retrying
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::Unauthorized { .. } | FetchError::Cancelled | FetchError::Decode(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Client-side field check failures; never sent to the server
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email is required")]
    EmailRequired,

    #[error("Please enter a valid email")]
    InvalidEmail,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Name is required")]
    NameRequired,

    #[error("Name must be at least 2 characters")]
    NameTooShort,
}

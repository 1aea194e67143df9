//! Authentication session for the dashboard
//!
//! The session record (bearer token + user profile) lives in one shared
//! [`SessionState`]. [`SessionStore`] drives the sign-in, sign-up and
//! sign-out flows through the API gateway; the gateway reads the same state
//! to attach credentials and to force expiry on a 401.

mod session;
mod state;
mod storage;
pub mod validate;

pub use session::SessionStore;
pub use state::{Session, SessionEvent, SessionState, SessionStatus};
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredCredentials};

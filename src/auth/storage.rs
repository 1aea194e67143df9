use crate::api::types::User;
use crate::core::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The persisted session record. Token and user are written and removed
/// together, never independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub user: User,
}

/// Durable backing for the session record
pub trait CredentialStore: Send + Sync {
    /// Read the persisted record, `None` when nothing is stored
    fn load(&self) -> Result<Option<StoredCredentials>>;

    /// Replace the persisted record
    fn save(&self, credentials: &StoredCredentials) -> Result<()>;

    /// Remove the persisted record. Removing an absent record is not an error.
    fn clear(&self) -> Result<()>;
}

/// JSON file store (`<home>/session.json`)
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// On-disk shape. Both halves are optional so a half-written or hand-edited
/// file is detected instead of failing to parse.
#[derive(Deserialize)]
struct RawRecord {
    token: Option<String>,
    user: Option<User>,
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let raw: RawRecord = serde_json::from_str(&content)?;
        match (raw.token, raw.user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                Ok(Some(StoredCredentials { token, user }))
            }
            (None, None) => Ok(None),
            _ => Err(Error::StorageError {
                message: format!("incomplete session record in {}", self.path.display()),
            }),
        }
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so readers never see a torn record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(credentials)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "Stored session credentials");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()), // Already cleared
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, used for ephemeral sessions and tests
#[derive(Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            record: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        *self.record.lock() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.record.lock() = None;
        Ok(())
    }
}

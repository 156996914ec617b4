use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::credentials::CredentialStore;
use super::session::Session;
use crate::models::User;

/// Well-known key the session record is stored under
pub const STORAGE_KEY: &str = "auth-storage";

/// Keychain account holding the refresh token
const REFRESH_TOKEN_ACCOUNT: &str = "refresh-token";

/// The persisted shape of a session.
///
/// The refresh token is carried in memory but never serialized; `FileStorage`
/// keeps it in the OS keychain instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub access_token: Option<String>,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub recently_logged_out: bool,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            user: session.user.clone(),
            is_authenticated: session.is_authenticated,
            recently_logged_out: session.recently_logged_out,
        }
    }
}

/// Where a `SessionStore` keeps its state between runs.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> Result<()>;
}

/// Session record as a JSON file, `<dir>/auth-storage.json`.
pub struct FileStorage {
    path: PathBuf,
    keychain: bool,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
            keychain: false,
        }
    }

    /// Also keep the refresh token in the OS keychain
    pub fn with_keychain(mut self) -> Self {
        self.keychain = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let mut record: PersistedSession =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        // An unreachable keychain costs the refresh token, not the session
        if self.keychain {
            record.refresh_token = match CredentialStore::get(REFRESH_TOKEN_ACCOUNT) {
                Ok(token) => token,
                Err(e) => {
                    warn!(error = %e, "Failed to read refresh token from keychain");
                    None
                }
            };
        }
        debug!(path = %self.path.display(), "Loaded session file");
        Ok(Some(record))
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;

        if self.keychain {
            match session.refresh_token.as_deref() {
                Some(token) => CredentialStore::store(REFRESH_TOKEN_ACCOUNT, token)?,
                None => CredentialStore::delete(REFRESH_TOKEN_ACCOUNT)?,
            }
        }
        Ok(())
    }
}

/// In-process storage; the record lives as long as the value.
#[derive(Default)]
pub struct MemoryStorage {
    record: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved record
    pub fn record(&self) -> Option<PersistedSession> {
        self.record.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.record())
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }
}

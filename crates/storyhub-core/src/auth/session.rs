use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use tracing::{debug, warn};

use super::storage::{PersistedSession, SessionStorage};
use crate::models::User;

/// Authentication state of the running client.
///
/// `is_authenticated` is only true while `access_token` is present and a
/// login has succeeded since the last logout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    /// Set by an explicit logout, cleared by the next login. Keeps the
    /// session initializer from reviving a session the user just ended.
    pub recently_logged_out: bool,
    /// Bumped by every login and logout. Work started under one generation
    /// must not write into the next.
    pub generation: u64,
}

/// Shared handle to the session.
///
/// Clone is cheap and all clones see the same state. Every mutation is a
/// single write under the lock, followed by a write-through to the storage
/// collaborator if one is attached.
#[derive(Clone, Default)]
pub struct SessionStore {
    state: Arc<RwLock<Session>>,
    storage: Option<Arc<dyn SessionStorage>>,
}

impl SessionStore {
    /// Create an empty, unpersisted session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session store that writes every mutation to `storage`
    pub fn with_storage(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            state: Arc::default(),
            storage: Some(storage),
        }
    }

    /// Load the persisted session, if any. Returns whether a record was found.
    pub fn restore(&self) -> Result<bool> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(false);
        };
        let Some(record) = storage.load()? else {
            return Ok(false);
        };

        let mut state = self.write();
        state.is_authenticated = record.is_authenticated && record.access_token.is_some();
        state.access_token = record.access_token;
        state.refresh_token = record.refresh_token;
        state.user = record.user;
        state.recently_logged_out = record.recently_logged_out;
        debug!(authenticated = state.is_authenticated, "Restored persisted session");
        Ok(true)
    }

    pub fn login(&self, access_token: String, refresh_token: Option<String>, user: Option<User>) {
        self.update(|s| {
            s.access_token = Some(access_token);
            s.refresh_token = refresh_token;
            s.user = user;
            s.is_authenticated = true;
            s.recently_logged_out = false;
            s.generation = s.generation.wrapping_add(1);
        });
    }

    pub fn logout(&self) {
        self.update(end_session);
    }

    /// Logout, unless a login or logout has happened since `generation`.
    /// Returns whether the session was ended.
    pub fn logout_if_current(&self, generation: u64) -> bool {
        self.update_if(Some(generation), end_session)
    }

    /// Store the result of a token refresh started under `generation`.
    ///
    /// Refused, returning false, when the session was logged out or replaced
    /// by another login in the meantime.
    pub fn apply_refresh(
        &self,
        generation: u64,
        access_token: String,
        refresh_token: Option<String>,
    ) -> bool {
        self.update_if(Some(generation), |s| {
            s.access_token = Some(access_token);
            if let Some(rotated) = refresh_token {
                s.refresh_token = Some(rotated);
            }
        })
    }

    /// Replace the access token after a silent refresh.
    /// Leaves `is_authenticated` and `user` untouched.
    pub fn set_access_token(&self, token: String) {
        self.update(|s| s.access_token = Some(token));
    }

    pub fn set_user(&self, user: User) {
        self.update(|s| s.user = Some(user));
    }

    pub fn clear_guard_flag(&self) {
        self.update(|s| s.recently_logged_out = false);
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn recently_logged_out(&self) -> bool {
        self.read().recently_logged_out
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Access token and generation, read together
    pub fn bearer(&self) -> (Option<String>, u64) {
        let state = self.read();
        (state.access_token.clone(), state.generation)
    }

    /// Copy of the whole session at this instant
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    fn update(&self, mutate: impl FnOnce(&mut Session)) {
        self.update_if(None, mutate);
    }

    fn update_if(&self, generation: Option<u64>, mutate: impl FnOnce(&mut Session)) -> bool {
        let record = {
            let mut state = self.write();
            if generation.is_some_and(|g| g != state.generation) {
                debug!(expected = ?generation, current = state.generation, "Session changed, skipping update");
                return false;
            }
            mutate(&mut state);
            PersistedSession::from(&*state)
        };

        if let Some(storage) = self.storage.as_ref() {
            if let Err(e) = storage.save(&record) {
                warn!(error = %e, "Failed to persist session");
            }
        }
        true
    }

    // A panic while holding the lock cannot leave a half-written field,
    // so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn end_session(s: &mut Session) {
    s.access_token = None;
    s.refresh_token = None;
    s.user = None;
    s.is_authenticated = false;
    s.recently_logged_out = true;
    s.generation = s.generation.wrapping_add(1);
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("is_authenticated", &state.is_authenticated)
            .field("recently_logged_out", &state.recently_logged_out)
            .field("has_access_token", &state.access_token.is_some())
            .field("persisted", &self.storage.is_some())
            .finish()
    }
}

//! Authentication state for the API client.
//!
//! This module provides:
//! - `SessionStore`: shared handle to the current tokens, user and logout guard
//! - `SessionStorage`: persistence collaborator (`FileStorage`, `MemoryStorage`)
//! - `CredentialStore`: OS keychain storage for the refresh token

pub mod credentials;
pub mod session;
pub mod storage;

pub use credentials::CredentialStore;
pub use session::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, PersistedSession, SessionStorage, STORAGE_KEY};

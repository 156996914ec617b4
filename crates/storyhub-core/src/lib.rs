//! storyhub core - authenticated API client, session store and ad selection
//! for the storyhub content platform.
//!
//! The pieces fit together like this:
//!
//! - [`auth::SessionStore`] holds the tokens, the user and the logout guard,
//!   optionally persisted through a [`auth::SessionStorage`].
//! - [`api::ApiClient`] attaches the access token to requests and renews it
//!   on 401 through a [`sync::SingleFlight`] refresh slot.
//! - [`api::AuthService`], [`api::AdsService`], [`api::PostsService`] and
//!   the other services wrap the backend endpoints.
//! - [`ads::pick_weighted_ad`] chooses which ad to show.

pub mod ads;
pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod sync;

pub use api::{
    AdsService, ApiClient, ApiError, AuthService, CommentsService, InteractionsService,
    NotificationsService, PostsService, RefreshError, RefreshMode,
};
pub use auth::{FileStorage, MemoryStorage, Session, SessionStore};
pub use config::Config;
pub use models::{Advertisement, Comment, Notification, Post, User};

//! REST API access for the storyhub backend.
//!
//! This module provides the `ApiClient` for authenticated requests, plus
//! thin services over it:
//!
//! - `AuthService`: login, profile, logout and session initialization
//! - `AdsService`: ad listing, slot selection and admin ad management
//! - `PostsService`, `CommentsService`: reading and writing content
//! - `InteractionsService`: likes and bookmarks
//! - `NotificationsService`: the user's activity feed
//!
//! The API uses bearer access tokens, renewed through `/auth/refresh` with a
//! refresh token sent in the body or held in an HTTP-only cookie.

pub mod ads;
pub mod auth;
pub mod client;
pub mod comments;
pub mod error;
pub mod interactions;
pub mod notifications;
pub mod posts;

pub use ads::AdsService;
pub use auth::AuthService;
pub use comments::CommentsService;
pub use interactions::InteractionsService;
pub use notifications::NotificationsService;
pub use posts::PostsService;
pub use client::{ApiClient, RefreshMode, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
pub use error::{ApiError, RefreshError};

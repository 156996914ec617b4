use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::client::{ApiClient, RefreshMode, LOGIN_PATH, LOGOUT_PATH};
use crate::models::{TokenPair, User};

/// Profile endpoint
const ME_PATH: &str = "/auth/me";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct LogoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Login, profile and logout flows over an `ApiClient`.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Log in and start a session.
    ///
    /// The profile is taken from the login response when present, otherwise
    /// fetched from `/auth/me`. A failed profile fetch leaves the session
    /// logged in without a user; the initializer retries it later.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>> {
        let TokenPair {
            access_token,
            refresh_token,
            user,
        } = self
            .api
            .post_json(LOGIN_PATH, &LoginRequest { username, password })
            .await
            .context("Login failed")?;

        if refresh_token.is_none() && self.api.refresh_mode() == RefreshMode::Body {
            warn!("Login response carried no refresh token; session cannot be renewed");
        }

        let session = self.api.session();
        session.login(access_token, refresh_token, user.clone());
        info!(username, "Logged in");

        if user.is_some() {
            return Ok(user);
        }

        match self.fetch_me().await {
            Ok(user) => {
                session.set_user(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch profile after login");
                Ok(None)
            }
        }
    }

    /// Fetch the authenticated user's profile
    pub async fn fetch_me(&self) -> Result<User> {
        self.api.get_json(ME_PATH).await
    }

    /// End the session.
    ///
    /// The backend is asked to revoke the refresh token first; that call is
    /// best effort and its failure does not keep the local session alive.
    pub async fn logout(&self) {
        let session = self.api.session();
        let refresh_token = session.refresh_token();
        let has_credential =
            refresh_token.is_some() || self.api.refresh_mode() == RefreshMode::Cookie;

        if has_credential {
            let request = self
                .api
                .request(Method::POST, LOGOUT_PATH)
                .json(&LogoutRequest { refresh_token });
            match self.api.execute(request).await {
                Ok(response) if response.status().is_success() => debug!("Refresh token revoked"),
                Ok(response) => warn!(status = %response.status(), "Logout request rejected"),
                Err(e) => warn!(error = %e, "Logout request failed"),
            }
        }

        session.logout();
        info!("Logged out");
    }

    /// Validate a session restored at startup.
    ///
    /// Does nothing right after an explicit logout. A token without a profile
    /// is checked against `/auth/me`; if that fails the session is a ghost
    /// and is cleared. Returns whether a usable session exists afterwards.
    pub async fn initialize_session(&self) -> bool {
        let session = self.api.session();
        let snapshot = session.snapshot();

        if snapshot.recently_logged_out {
            debug!("Recent logout, not restoring session");
            return false;
        }

        match (snapshot.access_token, snapshot.user) {
            (None, _) => false,
            (Some(_), Some(_)) => true,
            (Some(_), None) => {
                debug!("Validating restored session");
                match self.fetch_me().await {
                    Ok(user) => {
                        session.set_user(user);
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "Session validation failed, logging out");
                        session.logout();
                        false
                    }
                }
            }
        }
    }
}

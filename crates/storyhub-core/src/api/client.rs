//! Authenticated API client for the storyhub REST backend.
//!
//! `ApiClient` attaches the session's bearer token to every request. When the
//! backend answers 401 it refreshes the access token once, through a
//! single-flight slot shared by all concurrent callers, and replays the
//! request with the new token. A failed refresh ends the session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, Client, Method, Request, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ApiError, RefreshError};
use crate::auth::SessionStore;
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::TokenPair;
use crate::sync::SingleFlight;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint. A 401 here is a bad password, never a stale token.
pub const LOGIN_PATH: &str = "/auth/login";

/// Refresh endpoint. A 401 here means the refresh credential is dead.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Logout endpoint. Takes the refresh token; a 401 needs no refresh.
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Single-flight key for token refreshes
const REFRESH_FLIGHT: &str = "token-refresh";

/// How the refresh credential reaches the refresh endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// `{"refresh_token": ...}` in the request body, from the session
    #[default]
    Body,
    /// HTTP-only cookie set by the backend at login, held in the cookie jar
    Cookie,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

/// API client for the storyhub backend.
/// Clone is cheap - the connection pool, cookie jar, session and refresh slot
/// are all shared between clones.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    refresh_url: Url,
    refresh_mode: RefreshMode,
    cookies: Arc<Jar>,
    session: SessionStore,
    refreshes: SingleFlight<&'static str, Result<String, RefreshError>>,
}

impl ApiClient {
    /// Create a client for `base_url` using the body refresh variant
    pub fn new(base_url: &str, session: SessionStore) -> Result<Self> {
        Self::build(
            base_url,
            session,
            RefreshMode::Body,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &Config, session: SessionStore) -> Result<Self> {
        Self::build(
            &config.api_base_url,
            session,
            config.refresh_mode,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn build(
        base_url: &str,
        session: SessionStore,
        refresh_mode: RefreshMode,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let refresh_url = Url::parse(&format!("{}{}", base_url, REFRESH_PATH))
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;

        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(timeout)
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            client,
            base_url,
            refresh_url,
            refresh_mode,
            cookies,
            session,
            refreshes: SingleFlight::new(),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.refresh_mode
    }

    /// Absolute URL for an API path such as `/ads`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request against an API path. Send it with [`ApiClient::execute`].
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.endpoint(path))
    }

    /// Build and send a request through the authenticated path
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        self.send(request).await
    }

    /// Send a request with the current bearer token.
    ///
    /// On 401 the token is refreshed once and the request replayed. The
    /// replay is never retried again. Statuses other than 401 come back as a
    /// plain `Response`; transport errors as `ApiError::Network`.
    pub async fn send(&self, mut request: Request) -> Result<Response, ApiError> {
        let (sent_with, generation) = self.session.bearer();
        Self::attach_token(&mut request, sent_with.as_deref())?;

        let replay = request.try_clone();
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(%method, path = url.path(), "Sending request");
        let response = self.client.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if Self::is_auth_endpoint(&url) {
            warn!(path = url.path(), "Authentication endpoint returned 401, clearing session");
            self.end_session(generation);
            return Err(ApiError::Unauthorized);
        }

        // The request belonged to a session that has since ended
        if self.session.generation() != generation {
            debug!(%method, path = url.path(), "Session changed while request was in flight, not retrying");
            return Err(ApiError::Unauthorized);
        }

        let Some(mut replay) = replay else {
            warn!(%method, path = url.path(), "Request body cannot be replayed, not retrying");
            return Err(ApiError::Unauthorized);
        };

        let token = match self.token_for_retry(sent_with.as_deref()).await {
            Ok(token) => token,
            Err(RefreshError::SessionEnded) => {
                debug!(%method, path = url.path(), "Session ended during token refresh");
                return Err(ApiError::Unauthorized);
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging out");
                self.end_session(generation);
                return Err(ApiError::Unauthorized);
            }
        };

        Self::attach_token(&mut replay, Some(token.as_str()))?;
        debug!(%method, path = url.path(), "Retrying request with refreshed token");
        let response = self.client.execute(replay).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%method, path = url.path(), "Retried request still unauthorized, logging out");
            self.end_session(generation);
            return Err(ApiError::Unauthorized);
        }
        Ok(response)
    }

    /// Token to replay a request that failed with `sent_with`.
    /// If a concurrent refresh already replaced that token, use the new one.
    async fn token_for_retry(&self, sent_with: Option<&str>) -> Result<String, RefreshError> {
        if let Some(current) = self.session.access_token() {
            if sent_with != Some(current.as_str()) {
                debug!("Access token already replaced, skipping refresh");
                return Ok(current);
            }
        }
        self.refresh_access_token().await
    }

    /// Logout on behalf of a request sent under `generation`. A session
    /// started since then is left alone.
    fn end_session(&self, generation: u64) {
        if !self.session.logout_if_current(generation) {
            debug!("Session already replaced, not logging out");
        }
    }

    /// Obtain a new access token from the refresh endpoint.
    ///
    /// Concurrent calls share one network call and its outcome. On success
    /// the session holds the new token (and a rotated refresh token, if the
    /// backend sent one). The caller decides what a failure means.
    pub async fn refresh_access_token(&self) -> Result<String, RefreshError> {
        if self.refreshes.is_in_flight(&REFRESH_FLIGHT) {
            debug!("Joining token refresh already in flight");
        }
        let this = self.clone();
        self.refreshes
            .run(REFRESH_FLIGHT, move || async move { this.perform_refresh().await })
            .await
    }

    async fn perform_refresh(&self) -> Result<String, RefreshError> {
        let generation = self.session.generation();
        let refresh_token = match self.refresh_mode {
            RefreshMode::Body => Some(
                self.session
                    .refresh_token()
                    .ok_or(RefreshError::MissingCredential)?,
            ),
            RefreshMode::Cookie => {
                if self.cookies.cookies(&self.refresh_url).is_none() {
                    return Err(RefreshError::MissingCredential);
                }
                None
            }
        };

        info!(mode = ?self.refresh_mode, "Refreshing access token");
        let response = self
            .client
            .post(self.refresh_url.clone())
            .json(&RefreshRequest {
                refresh_token: refresh_token.as_deref(),
            })
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status.as_u16()));
        }

        let pair: TokenPair = response
            .json()
            .await
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        // A logout or login while the call was in flight wins over its result
        if !self
            .session
            .apply_refresh(generation, pair.access_token.clone(), pair.refresh_token)
        {
            info!("Session changed during token refresh, discarding new token");
            return Err(RefreshError::SessionEnded);
        }
        debug!("Access token refreshed");
        Ok(pair.access_token)
    }

    fn attach_token(request: &mut Request, token: Option<&str>) -> Result<(), ApiError> {
        let headers = request.headers_mut();
        match token {
            Some(token) => {
                let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidToken)?;
                headers.insert(header::AUTHORIZATION, value);
            }
            None => {
                headers.remove(header::AUTHORIZATION);
            }
        }
        Ok(())
    }

    fn is_auth_endpoint(url: &Url) -> bool {
        let path = url.path().trim_end_matches('/');
        [LOGIN_PATH, REFRESH_PATH, LOGOUT_PATH]
            .iter()
            .any(|endpoint| path.ends_with(endpoint))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send `builder` and parse a successful JSON response
    pub async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        let url = response.url().clone();
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url.path()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.fetch_json(self.request(Method::GET, path))
            .await
            .with_context(|| format!("GET {} failed", path))
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.fetch_json(self.request(Method::POST, path).json(body))
            .await
            .with_context(|| format!("POST {} failed", path))
    }

    pub async fn patch_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.fetch_json(self.request(Method::PATCH, path).json(body))
            .await
            .with_context(|| format!("PATCH {} failed", path))
    }

    /// Send a DELETE, discarding any response body
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .execute(self.request(Method::DELETE, path))
            .await
            .with_context(|| format!("DELETE {} failed", path))?;
        Self::check_response(response).await?;
        Ok(())
    }
}

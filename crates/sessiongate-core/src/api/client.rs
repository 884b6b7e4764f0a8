//! API client for the session endpoints.
//!
//! This module provides the `ApiClient` struct, which implements the auth
//! transport (`/auth/login`, `/auth/refresh`, `/auth/logout`) and offers
//! authenticated `get`/`post` helpers to the rest of the application.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{AuthTransport, CredentialStore, ExecutionContext};
use crate::config::Config;
use crate::models::{LoginRequest, TokenResponse};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";
const REFRESH_PATH: &str = "/auth/refresh";
const LOGOUT_PATH: &str = "/auth/logout";

/// Maximum number of retries for rate-limited (429) requests.
/// Applies to `get`/`post` only; the auth endpoints are never retried.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// HTTP client bound to one execution context and one credential store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl ApiClient {
    /// Create a client for `context` with its own connection pool.
    pub fn new(
        config: &Config,
        context: &ExecutionContext,
        credentials: CredentialStore,
    ) -> Result<Self, ApiError> {
        let http = Self::http_client(config, context)?;
        Ok(Self::with_http(http, config, context, credentials))
    }

    /// Build the underlying HTTP client for `context`.
    ///
    /// The client context gets a cookie jar so the refresh cookie set at login
    /// rides along on every request. The server-rendering context has none and
    /// forwards the inbound cookie explicitly instead, so one such client can
    /// be shared by every inbound request.
    pub fn http_client(config: &Config, context: &ExecutionContext) -> Result<Client, ApiError> {
        let mut builder =
            Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        if !context.is_server_render() {
            builder = builder.cookie_store(true);
        }
        Ok(builder.build()?)
    }

    /// Wrap an existing HTTP client, binding it to `context` and `credentials`.
    pub fn with_http(
        http: Client,
        config: &Config,
        context: &ExecutionContext,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            client: http,
            base_url: context.api_base(config).trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `Authorization` header for the current credential (empty when signed out).
    pub fn auth_headers(&self) -> HeaderMap {
        self.credentials.auth_headers()
    }

    /// Request builder with the bearer header already attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .headers(self.auth_headers())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Like `check_response`, but Ok(None) for a rate limit (should retry).
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ApiError> {
        if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            Self::check_response(response).await.map(Some)
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    async fn send_with_retry<T, F>(&self, path: &str, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build().send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Self::read_json(response, path).await,
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(path, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    /// Authenticated GET returning JSON.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_with_retry(path, || self.request(Method::GET, path))
            .await
    }

    /// Authenticated POST with a JSON body, returning JSON.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_with_retry(path, || self.request(Method::POST, path).json(body))
            .await
    }

    /// Bodyless POST to an auth endpoint, carrying `cookie` when one is forwarded.
    fn auth_post(&self, path: &str, cookie: Option<&str>) -> Result<RequestBuilder, ApiError> {
        let mut request = self.client.post(self.url(path));
        if let Some(cookie) = cookie {
            let mut value = HeaderValue::from_str(cookie)?;
            value.set_sensitive(true);
            request = request.header(header::COOKIE, value);
        }
        Ok(request)
    }
}

impl AuthTransport for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ApiError> {
        debug!(username = %request.username, "Sending login request");
        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(request)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response, "login response").await
    }

    async fn refresh(&self, cookie: Option<&str>) -> Result<TokenResponse, ApiError> {
        let response = self.auth_post(REFRESH_PATH, cookie)?.send().await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response, "refresh response").await
    }

    async fn logout(&self, cookie: Option<&str>) -> Result<(), ApiError> {
        let response = self.auth_post(LOGOUT_PATH, cookie)?.send().await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

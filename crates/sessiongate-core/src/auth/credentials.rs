use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::models::TokenResponse;

/// Buffer time before expiry at which a credential should be renewed (5 minutes)
const TOKEN_REFRESH_BUFFER_SECS: i64 = 5 * 60;

/// Upper bound applied to server-declared lifetimes (ten years)
const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Short-lived bearer credential issued by login or renewal.
///
/// The token is opaque to this crate. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential {
    token: String,
    expires_in: u64,
    issued_at: DateTime<Utc>,
}

impl AccessCredential {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            token: token.into(),
            expires_in,
            issued_at: Utc::now(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Declared lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = self.expires_in.min(MAX_LIFETIME_SECS) as i64;
        self.issued_at + Duration::seconds(lifetime)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the credential will expire soon and should be renewed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() > self.expires_at() - Duration::seconds(TOKEN_REFRESH_BUFFER_SECS)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_minutes().max(0)
    }
}

impl From<TokenResponse> for AccessCredential {
    fn from(resp: TokenResponse) -> Self {
        Self::new(resp.access_token, resp.expires_in)
    }
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredential")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[derive(Default)]
struct Slot {
    credential: Option<AccessCredential>,
    /// Bumped on every `clear()`
    generation: u64,
}

/// In-memory holder of the current access credential.
///
/// Clone is cheap and every clone observes the same credential: hand one to
/// each component that needs to read or replace it. The server-rendering path
/// builds a fresh store per inbound request instead of sharing one.
#[derive(Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Slot>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current credential, if any.
    pub fn read(&self) -> Option<AccessCredential> {
        self.inner.read().credential.clone()
    }

    pub fn is_present(&self) -> bool {
        self.inner.read().credential.is_some()
    }

    /// Replace the current credential.
    pub fn write(&self, credential: AccessCredential) {
        debug!(expires_in = credential.expires_in(), "Access credential stored");
        self.inner.write().credential = Some(credential);
    }

    pub fn clear(&self) {
        let mut slot = self.inner.write();
        slot.credential = None;
        slot.generation += 1;
        debug!(generation = slot.generation, "Access credential cleared");
    }

    /// Number of `clear()` calls so far; lets a renewal detect a sign-out that
    /// happened while it was in flight.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Store `credential` only if the store has not been cleared since
    /// `generation` was observed. Returns whether the write happened.
    pub fn write_if_generation(&self, credential: AccessCredential, generation: u64) -> bool {
        let mut slot = self.inner.write();
        if slot.generation != generation {
            return false;
        }
        debug!(expires_in = credential.expires_in(), "Access credential stored");
        slot.credential = Some(credential);
        true
    }

    /// `Authorization: Bearer <token>` for the current credential, or `None`.
    pub fn bearer_header(&self) -> Option<HeaderValue> {
        let guard = self.inner.read();
        let credential = guard.credential.as_ref()?;
        match HeaderValue::from_str(&format!("Bearer {}", credential.token())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                Some(value)
            }
            Err(_) => {
                warn!("Stored access token is not a valid header value, sending no Authorization");
                None
            }
        }
    }

    /// Headers to attach to an outbound authenticated request.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.bearer_header() {
            headers.insert(header::AUTHORIZATION, value);
        }
        headers
    }
}

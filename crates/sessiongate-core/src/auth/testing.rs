//! Scripted in-memory transport for exercising the session layer without HTTP.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::AuthTransport;
use crate::api::ApiError;
use crate::models::{LoginRequest, TokenResponse};

pub(crate) fn token(access_token: &str, expires_in: u64) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        expires_in,
    }
}

/// Answers refresh calls from a queue (denied once the queue is empty) and
/// records what it was asked. Results queued for a specific cookie are served
/// only to exchanges forwarding that cookie.
#[derive(Default)]
pub(crate) struct FakeTransport {
    refresh_results: Mutex<VecDeque<Result<TokenResponse, ApiError>>>,
    refresh_results_by_cookie: Mutex<HashMap<String, VecDeque<Result<TokenResponse, ApiError>>>>,
    login_result: Mutex<Option<Result<TokenResponse, ApiError>>>,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    logout_fails: AtomicBool,
    cookies_seen: Mutex<Vec<Option<String>>>,
    hold: AtomicBool,
    release: Notify,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_refresh(&self, result: Result<TokenResponse, ApiError>) {
        self.refresh_results.lock().push_back(result);
    }

    pub(crate) fn push_refresh_for(&self, cookie: &str, result: Result<TokenResponse, ApiError>) {
        self.refresh_results_by_cookie
            .lock()
            .entry(cookie.to_string())
            .or_default()
            .push_back(result);
    }

    pub(crate) fn set_login(&self, result: Result<TokenResponse, ApiError>) {
        *self.login_result.lock() = Some(result);
    }

    pub(crate) fn fail_logout(&self) {
        self.logout_fails.store(true, Ordering::SeqCst);
    }

    /// Park every refresh exchange until [`FakeTransport::release`] is called.
    pub(crate) fn hold_refresh(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn cookies_seen(&self) -> Vec<Option<String>> {
        self.cookies_seen.lock().clone()
    }
}

impl AuthTransport for FakeTransport {
    async fn login(&self, _request: &LoginRequest) -> Result<TokenResponse, ApiError> {
        self.login_result
            .lock()
            .take()
            .unwrap_or(Err(ApiError::Unauthorized))
    }

    async fn refresh(&self, cookie: Option<&str>) -> Result<TokenResponse, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.cookies_seen.lock().push(cookie.map(str::to_string));

        if self.hold.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        tokio::task::yield_now().await;

        let keyed = cookie.and_then(|cookie| {
            self.refresh_results_by_cookie
                .lock()
                .get_mut(cookie)
                .and_then(VecDeque::pop_front)
        });
        keyed
            .or_else(|| self.refresh_results.lock().pop_front())
            .unwrap_or(Err(ApiError::Unauthorized))
    }

    async fn logout(&self, cookie: Option<&str>) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.cookies_seen.lock().push(cookie.map(str::to_string));
        tokio::task::yield_now().await;

        if self.logout_fails.load(Ordering::SeqCst) {
            Err(ApiError::ServerError {
                status: 503,
                body: "unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

//! HTTP client module for the session API.
//!
//! This module provides the `ApiClient` used both as the transport for the
//! auth endpoints (`/auth/login`, `/auth/refresh`, `/auth/logout`) and as the
//! authenticated request helper for the rest of the application.
//!
//! Requests carry the bearer token from the shared `CredentialStore`; on the
//! client context a cookie jar keeps the refresh cookie attached.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

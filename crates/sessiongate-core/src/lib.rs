//! Client-side session layer for a cookie-refreshed bearer token API.
//!
//! The crate keeps a short-lived access credential in memory, renews it
//! through the server's refresh cookie, gates navigation to protected routes
//! on having a credential, and hands the credential to outbound API calls.
//!
//! - [`auth`]: credential store, renewal coordinator, navigation gate, sign-out
//! - [`api`]: HTTP client for the auth endpoints and authenticated requests
//! - [`models`]: wire types shared by login and renewal
//! - [`config`]: runtime configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AccessCredential, AuthTransport, CredentialStore, ExecutionContext, GateState,
    NavigationGate, NavigationOutcome, ProtectedRoutes, RenewalAttempt, RenewalCoordinator,
    RenewalError, ServerRenderSessions, SessionContext, SignOutFlow,
};
pub use config::Config;
pub use models::{LoginRequest, TokenResponse};

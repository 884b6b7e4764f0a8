//! Session management: the in-memory access credential and everything that
//! keeps it current.
//!
//! This module provides:
//! - `CredentialStore`: shared holder of the current `AccessCredential`
//! - `RenewalCoordinator`: single-flight exchange of the refresh cookie for a new credential
//! - `NavigationGate`: pre-navigation hook for protected routes
//! - `SignOutFlow`: local clear plus server-side revocation
//! - `SessionContext`: all of the above wired together for one execution context
//!
//! Credentials live only in memory and are never logged.

pub mod context;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod renewal;
pub mod session;
pub mod signout;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use context::ExecutionContext;
pub use credentials::{AccessCredential, CredentialStore};
pub use error::RenewalError;
pub use gate::{GateState, NavigationGate, NavigationOutcome, ProtectedRoutes};
pub use renewal::{RenewalAttempt, RenewalCoordinator};
pub use session::{ServerRenderSessions, SessionContext};
pub use signout::SignOutFlow;
pub use transport::AuthTransport;

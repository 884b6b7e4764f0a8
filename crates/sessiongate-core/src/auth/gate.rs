//! Pre-navigation hook for protected routes.
//!
//! Each navigation runs a small state machine:
//!
//! ```text
//! Checking ──credential present──────────────▶ Authorized  (proceed)
//!    │ ──absent, server-rendering────────────▶ Deferred    (proceed unauthenticated)
//!    └─absent, client──▶ Renewing ──ok───────▶ Authorized  (proceed)
//!                           └────────failed──▶ Redirecting (to the landing route)
//! ```
//!
//! The server-rendering pass never renews: it can run before the hosting
//! proxy has propagated the refresh cookie, and a renewal failure there would
//! sign the user out. The client pass retries with the full cookie jar.

use tracing::{debug, warn};

use super::{AuthTransport, CredentialStore, ExecutionContext, RenewalCoordinator};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Renewing,
    /// No credential on the server-rendering pass; left to the client pass.
    Deferred,
    Authorized,
    Redirecting,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GateState::Deferred | GateState::Authorized | GateState::Redirecting
        )
    }
}

/// How a navigation attempt resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Proceed,
    Redirect { to: String },
}

impl NavigationOutcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, NavigationOutcome::Proceed)
    }
}

/// Route prefixes that require a credential.
#[derive(Debug, Clone, Default)]
pub struct ProtectedRoutes {
    prefixes: Vec<String>,
}

impl ProtectedRoutes {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .map(|p: String| p.trim_end_matches('/').to_string())
                .collect(),
        }
    }

    /// Whole-segment prefix match: `/admin` covers `/admin` and `/admin/users`
    /// but not `/administrators`. An empty prefix (from `/`) covers everything.
    pub fn is_protected(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        self.prefixes.iter().any(|prefix| {
            prefix.is_empty()
                || path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Runs before every navigation; see the module docs for the state machine.
pub struct NavigationGate<T> {
    context: ExecutionContext,
    store: CredentialStore,
    coordinator: RenewalCoordinator<T>,
    routes: ProtectedRoutes,
    landing_route: String,
}

impl<T> Clone for NavigationGate<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            store: self.store.clone(),
            coordinator: self.coordinator.clone(),
            routes: self.routes.clone(),
            landing_route: self.landing_route.clone(),
        }
    }
}

impl<T: AuthTransport> NavigationGate<T> {
    pub fn new(
        context: ExecutionContext,
        store: CredentialStore,
        coordinator: RenewalCoordinator<T>,
        config: &Config,
    ) -> Self {
        Self {
            context,
            store,
            coordinator,
            routes: ProtectedRoutes::new(config.protected_routes.iter().cloned()),
            landing_route: config.landing_route.clone(),
        }
    }

    pub fn routes(&self) -> &ProtectedRoutes {
        &self.routes
    }

    /// Decide whether navigation to `path` may proceed.
    ///
    /// Never fails: renewal errors become a redirect to the landing route.
    pub async fn before_navigate(&self, path: &str) -> NavigationOutcome {
        if !self.routes.is_protected(path) {
            return NavigationOutcome::Proceed;
        }

        let mut state = GateState::Checking;
        // Observed before renewing so a sign-out during the exchange wins.
        let generation = self.store.generation();

        loop {
            let next = match state {
                GateState::Checking => {
                    if self.store.is_present() {
                        GateState::Authorized
                    } else if self.context.is_server_render() {
                        GateState::Deferred
                    } else {
                        GateState::Renewing
                    }
                }
                GateState::Renewing => match self.coordinator.renew().await {
                    Ok(credential) => {
                        if self.store.write_if_generation(credential, generation) {
                            GateState::Authorized
                        } else {
                            warn!(path, "Signed out while renewing, discarding renewed credential");
                            GateState::Redirecting
                        }
                    }
                    Err(e) => {
                        warn!(path, error = %e, "Renewal failed, redirecting");
                        GateState::Redirecting
                    }
                },
                GateState::Authorized | GateState::Deferred => {
                    return NavigationOutcome::Proceed;
                }
                GateState::Redirecting => {
                    return NavigationOutcome::Redirect {
                        to: self.landing_route.clone(),
                    };
                }
            };
            debug!(path, from = ?state, to = ?next, "Navigation gate transition");
            state = next;
        }
    }
}

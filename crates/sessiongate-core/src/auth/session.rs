use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use tracing::{error, info, warn};

use super::{
    AccessCredential, AuthTransport, CredentialStore, ExecutionContext, NavigationGate,
    NavigationOutcome, RenewalAttempt, RenewalCoordinator, RenewalError, SignOutFlow,
};
use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::models::LoginRequest;

/// One credential store wired to its renewal coordinator, navigation gate and
/// sign-out flow.
///
/// Build a single client-context session for the lifetime of the process and
/// clone it where needed (clones share all state). On the server-rendering
/// path take a fresh session per inbound request from [`ServerRenderSessions`]
/// so no credential or renewal attempt is ever shared between users.
pub struct SessionContext<T: AuthTransport = ApiClient> {
    context: ExecutionContext,
    store: CredentialStore,
    transport: Arc<T>,
    coordinator: RenewalCoordinator<T>,
    gate: NavigationGate<T>,
    sign_out: SignOutFlow<T>,
}

impl<T: AuthTransport> Clone for SessionContext<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            store: self.store.clone(),
            transport: self.transport.clone(),
            coordinator: self.coordinator.clone(),
            gate: self.gate.clone(),
            sign_out: self.sign_out.clone(),
        }
    }
}

impl SessionContext<ApiClient> {
    /// Session for the client context: HTTP client with a cookie jar, talking
    /// to `config.api_base`.
    pub fn client(config: &Config) -> Result<Self, ApiError> {
        let context = ExecutionContext::Client;
        let store = CredentialStore::new();
        let api = ApiClient::new(config, &context, store.clone())?;
        Ok(Self::with_transport(config, context, store, Arc::new(api)))
    }

    /// HTTP client for authenticated calls; it reads the bearer token from this
    /// session's store.
    pub fn api(&self) -> &ApiClient {
        &self.transport
    }
}

/// Source of request-scoped sessions for the server-rendering context.
///
/// One HTTP client (no cookie jar, talking to `config.api_base_server`) is
/// shared by every inbound request. Each session gets its own store and
/// renewal slot.
#[derive(Clone)]
pub struct ServerRenderSessions {
    config: Config,
    http: Client,
}

impl ServerRenderSessions {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = ApiClient::http_client(config, &ExecutionContext::server_render(None))?;
        Ok(Self {
            config: config.clone(),
            http,
        })
    }

    /// Session for one inbound request. `inbound_cookie` is the `Cookie`
    /// header of the request being rendered.
    pub fn for_request(&self, inbound_cookie: Option<&str>) -> SessionContext {
        let context = ExecutionContext::server_render(inbound_cookie);
        let store = CredentialStore::new();
        let api = ApiClient::with_http(self.http.clone(), &self.config, &context, store.clone());
        SessionContext::with_transport(&self.config, context, store, Arc::new(api))
    }
}

impl<T: AuthTransport> SessionContext<T> {
    pub fn with_transport(
        config: &Config,
        context: ExecutionContext,
        store: CredentialStore,
        transport: Arc<T>,
    ) -> Self {
        let cookie = context.forwarded_cookie().map(str::to_string);
        let coordinator = RenewalCoordinator::new(transport.clone(), cookie.clone());
        let gate = NavigationGate::new(context.clone(), store.clone(), coordinator.clone(), config);
        let sign_out = SignOutFlow::new(store.clone(), transport.clone(), cookie);

        Self {
            context,
            store,
            transport,
            coordinator,
            gate,
            sign_out,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn gate(&self) -> &NavigationGate<T> {
        &self.gate
    }

    /// Exchange credentials for a first access credential and store it.
    ///
    /// On the client context the refresh cookie set by the response stays in
    /// the HTTP client's cookie jar for later renewals.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessCredential, ApiError> {
        let request = LoginRequest::new(username, password);
        match self.transport.login(&request).await {
            Ok(resp) => {
                let credential = AccessCredential::from(resp);
                self.store.write(credential.clone());
                info!(username, "Login successful");
                Ok(credential)
            }
            Err(e) => {
                error!(username, error = %e, "Login failed");
                Err(e)
            }
        }
    }

    /// Start or join the outstanding renewal. Does not touch the store.
    pub fn renew(&self) -> RenewalAttempt {
        self.coordinator.renew()
    }

    /// Renew and store the result; the direct-caller counterpart of the gate.
    pub async fn refresh(&self) -> Result<AccessCredential, RenewalError> {
        let generation = self.store.generation();
        let credential = self.coordinator.renew().await?;
        if !self.store.write_if_generation(credential.clone(), generation) {
            warn!("Signed out while refreshing, renewed credential not stored");
        }
        Ok(credential)
    }

    pub async fn before_navigate(&self, path: &str) -> NavigationOutcome {
        self.gate.before_navigate(path).await
    }

    /// Clear the store now; the returned future notifies the server.
    pub fn sign_out(&self) -> impl Future<Output = ()> + Send + 'static {
        self.sign_out.sign_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{token, FakeTransport};

    fn session(context: ExecutionContext) -> (SessionContext<FakeTransport>, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::new());
        let session = SessionContext::with_transport(
            &Config::default(),
            context,
            CredentialStore::new(),
            transport.clone(),
        );
        (session, transport)
    }

    #[tokio::test]
    async fn test_login_stores_credential() {
        let (session, transport) = session(ExecutionContext::Client);
        transport.set_login(Ok(token("L", 900)));

        let credential = session.login("ana", "s3cret").await.unwrap();
        assert_eq!(credential.token(), "L");
        assert_eq!(session.store().read().unwrap(), credential);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_store_absent() {
        let (session, transport) = session(ExecutionContext::Client);
        transport.set_login(Err(ApiError::Unauthorized));

        assert!(matches!(
            session.login("ana", "wrong").await,
            Err(ApiError::Unauthorized)
        ));
        assert!(session.store().read().is_none());
    }

    #[tokio::test]
    async fn test_login_then_protected_navigation_needs_no_renewal() {
        let (session, transport) = session(ExecutionContext::Client);
        transport.set_login(Ok(token("L", 900)));

        session.login("ana", "s3cret").await.unwrap();
        assert!(session.before_navigate("/admin").await.is_proceed());
        assert_eq!(transport.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_renew_does_not_write_store_but_refresh_does() {
        let (session, transport) = session(ExecutionContext::Client);
        transport.push_refresh(Ok(token("R1", 60)));
        transport.push_refresh(Ok(token("R2", 60)));

        assert_eq!(session.renew().await.unwrap().token(), "R1");
        assert!(session.store().read().is_none());

        assert_eq!(session.refresh().await.unwrap().token(), "R2");
        assert_eq!(session.store().read().unwrap().token(), "R2");
    }

    #[tokio::test]
    async fn test_sign_out_then_navigation_renews_again() {
        let (session, transport) = session(ExecutionContext::Client);
        transport.set_login(Ok(token("L", 900)));
        transport.push_refresh(Err(ApiError::Unauthorized));

        session.login("ana", "s3cret").await.unwrap();
        session.sign_out().await;
        assert!(session.store().read().is_none());
        assert_eq!(transport.logout_calls(), 1);

        assert_eq!(
            session.before_navigate("/admin").await,
            NavigationOutcome::Redirect { to: "/".to_string() }
        );
        assert_eq!(transport.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_one_store_and_slot() {
        let (session, transport) = session(ExecutionContext::Client);
        transport.push_refresh(Ok(token("T", 900)));
        let other = session.clone();

        let (a, b) = tokio::join!(session.renew(), other.renew());
        assert_eq!(a, b);
        assert_eq!(transport.refresh_calls(), 1);

        other.store().write(a.unwrap());
        assert!(session.store().is_present());
    }

    #[tokio::test]
    async fn test_server_render_sessions_are_isolated_per_request() {
        let transport = Arc::new(FakeTransport::new());
        let config = Config::default();
        let alice = SessionContext::with_transport(
            &config,
            ExecutionContext::server_render(Some("rt=alice")),
            CredentialStore::new(),
            transport.clone(),
        );
        let bob = SessionContext::with_transport(
            &config,
            ExecutionContext::server_render(Some("rt=bob")),
            CredentialStore::new(),
            transport.clone(),
        );

        alice.store().write(AccessCredential::new("alice-token", 60));
        assert!(bob.store().read().is_none());
        assert!(bob.before_navigate("/admin").await.is_proceed());
        assert_eq!(transport.refresh_calls(), 0);

        transport.push_refresh_for("rt=alice", Ok(token("A", 60)));
        transport.push_refresh_for("rt=bob", Ok(token("B", 60)));
        let (a, b) = tokio::join!(alice.refresh(), bob.refresh());
        assert_eq!(a.unwrap().token(), "A");
        assert_eq!(b.unwrap().token(), "B");
        assert_eq!(alice.store().read().unwrap().token(), "A");
        assert_eq!(bob.store().read().unwrap().token(), "B");

        let mut cookies = transport.cookies_seen();
        cookies.sort();
        assert_eq!(
            cookies,
            vec![Some("rt=alice".to_string()), Some("rt=bob".to_string())]
        );
    }

    #[test]
    fn test_request_sessions_share_http_client_but_not_state() {
        let sessions = ServerRenderSessions::new(&Config::default()).unwrap();
        let alice = sessions.for_request(Some("rt=alice"));
        let bob = sessions.for_request(Some("rt=bob"));

        alice.store().write(AccessCredential::new("A", 60));
        assert!(bob.store().read().is_none());
        assert_eq!(alice.context().forwarded_cookie(), Some("rt=alice"));
        assert_eq!(bob.context().forwarded_cookie(), Some("rt=bob"));
        assert_eq!(bob.api().base_url(), "http://localhost:8080");
        assert!(bob.api().auth_headers().is_empty());
    }
}

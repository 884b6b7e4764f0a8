use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{AuthTransport, CredentialStore};

/// Local sign-out plus a courtesy revocation call to the server.
pub struct SignOutFlow<T> {
    store: CredentialStore,
    transport: Arc<T>,
    cookie: Option<String>,
}

impl<T> Clone for SignOutFlow<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            transport: self.transport.clone(),
            cookie: self.cookie.clone(),
        }
    }
}

impl<T: AuthTransport> SignOutFlow<T> {
    pub fn new(store: CredentialStore, transport: Arc<T>, cookie: Option<String>) -> Self {
        Self {
            store,
            transport,
            cookie,
        }
    }

    /// Clear the credential store now, and return the server notification.
    ///
    /// The store is already empty when this returns; awaiting (or spawning) the
    /// returned future only sends `POST /auth/logout`. A failed notification is
    /// logged and never restores the credential.
    pub fn sign_out(&self) -> impl Future<Output = ()> + Send + 'static {
        self.store.clear();
        info!("Signed out locally");

        let transport = Arc::clone(&self.transport);
        let cookie = self.cookie.clone();
        async move {
            match transport.logout(cookie.as_deref()).await {
                Ok(()) => debug!("Server session revoked"),
                Err(e) => warn!(error = %e, "Server sign-out notification failed"),
            }
        }
    }
}

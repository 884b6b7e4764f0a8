use std::future::Future;

use crate::api::ApiError;
use crate::models::{LoginRequest, TokenResponse};

/// The three auth endpoints the session layer talks to.
///
/// [`crate::ApiClient`] is the HTTP implementation. `cookie` is the inbound
/// request's `Cookie` header on the server-rendering context and `None` on the
/// client context, where the transport's own cookie jar supplies it.
pub trait AuthTransport: Send + Sync + 'static {
    /// `POST /auth/login`
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<TokenResponse, ApiError>> + Send;

    /// `POST /auth/refresh`; any non-2xx answer is an error.
    fn refresh(
        &self,
        cookie: Option<&str>,
    ) -> impl Future<Output = Result<TokenResponse, ApiError>> + Send;

    /// `POST /auth/logout`
    fn logout(&self, cookie: Option<&str>) -> impl Future<Output = Result<(), ApiError>> + Send;
}

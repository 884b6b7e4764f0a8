use crate::config::Config;

/// Where the session layer is running.
///
/// The client context keeps state for the whole browsing session and relies on
/// the HTTP client's cookie jar. The server-rendering context lives for one
/// inbound request and has no cookie jar, so it carries the inbound `Cookie`
/// header to forward on renewal.
#[derive(Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    Client,
    ServerRender { cookie: Option<String> },
}

impl ExecutionContext {
    pub fn server_render(cookie: Option<&str>) -> Self {
        ExecutionContext::ServerRender {
            cookie: cookie.map(str::to_string),
        }
    }

    pub fn is_server_render(&self) -> bool {
        matches!(self, ExecutionContext::ServerRender { .. })
    }

    /// Cookie header to forward explicitly with auth calls.
    pub fn forwarded_cookie(&self) -> Option<&str> {
        match self {
            ExecutionContext::Client => None,
            ExecutionContext::ServerRender { cookie } => cookie.as_deref(),
        }
    }

    /// API base URL for this context.
    pub fn api_base<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            ExecutionContext::Client => &config.api_base,
            ExecutionContext::ServerRender { .. } => &config.api_base_server,
        }
    }
}

// The cookie carries the refresh session identifier and must never be logged.
impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionContext::Client => f.write_str("Client"),
            ExecutionContext::ServerRender { cookie } => f
                .debug_struct("ServerRender")
                .field("cookie", &cookie.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_follows_context() {
        let config = Config::default();
        assert_eq!(ExecutionContext::Client.api_base(&config), config.api_base);
        assert_eq!(
            ExecutionContext::server_render(None).api_base(&config),
            config.api_base_server
        );
    }

    #[test]
    fn test_only_server_render_forwards_cookie() {
        assert_eq!(ExecutionContext::Client.forwarded_cookie(), None);
        let ctx = ExecutionContext::server_render(Some("rt=abc"));
        assert!(ctx.is_server_render());
        assert_eq!(ctx.forwarded_cookie(), Some("rt=abc"));
    }

    #[test]
    fn test_debug_redacts_cookie() {
        let ctx = ExecutionContext::server_render(Some("rt=abc"));
        assert!(!format!("{:?}", ctx).contains("rt=abc"));
    }
}

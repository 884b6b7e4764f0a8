use thiserror::Error;

use crate::api::ApiError;

/// Why a renewal attempt failed.
///
/// Cloneable so a single failed exchange can be handed to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenewalError {
    /// The server answered with a non-2xx status (expired, revoked or missing session).
    #[error("Renewal denied by server (status {status})")]
    Denied { status: u16 },

    /// The exchange never produced a usable answer.
    #[error("Renewal transport failure: {0}")]
    Transport(String),
}

impl From<ApiError> for RenewalError {
    fn from(err: ApiError) -> Self {
        match err.status() {
            Some(status) => RenewalError::Denied { status },
            None => RenewalError::Transport(err.to_string()),
        }
    }
}

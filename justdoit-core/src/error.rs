//! Error taxonomy for backend calls.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Login or registration was refused (bad credentials, duplicate email).
    #[error("{0}")]
    Auth(String),

    /// No token, or the backend rejected the one we sent.
    #[error("not signed in")]
    Unauthenticated,

    #[error("not found")]
    NotFound,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Generic request failures: shown inline, never a reason to log out.
    pub fn is_request_failed(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound
                | ApiError::Server { .. }
                | ApiError::Network(_)
                | ApiError::Decode(_)
        )
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }
}

//! Error taxonomy for the spotpilot core.
//!
//! Token handling only ever surfaces [`AuthError`]; raw HTTP failure detail
//! from the token endpoint stays inside the token manager. Everything that
//! talks to the Web API returns [`ApiError`], which distinguishes upstream
//! refusals (non-2xx) from transient connectivity failures.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored data is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither an access token nor a refresh token is available.
    #[error("Not authenticated. Run \"spotpilot auth\" first.")]
    Unauthenticated,
    /// A refresh was attempted and did not produce a usable token.
    #[error("Session expired. Run \"spotpilot auth\" to re-authenticate.")]
    SessionExpired,
    #[error("Cannot access token storage: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Non-2xx response. `message` is the upstream error message when the body
    /// carried one, otherwise a description of the failed operation.
    #[error("{message} (HTTP {status})")]
    Upstream { status: u16, message: String },
    /// Connection failures and timeouts.
    #[error("network error: {0}")]
    Transient(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        ApiError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// True for failures worth giving up on the whole operation: auth problems
    /// and lost connectivity. Upstream refusals of a single request are not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Auth(_) | ApiError::Transient(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::upstream(status.as_u16(), err.to_string())
        } else {
            // timeouts, refused connections, DNS, TLS
            ApiError::Transient(err.to_string())
        }
    }
}

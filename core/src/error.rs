//! Error types for the Simplest API client.
//!
//! # Design
//! The backend never signals failure with an HTTP status. A failed call
//! comes back as a `{error_code, error_message}` body, which lands in
//! `Backend` untouched. Everything that goes wrong before the backend could
//! answer (no network, server down, a PHP fatal printed as HTML) collapses
//! into `NotServer`, because callers only ever show "check your Internet"
//! for those. Local precondition failures get their own variants so they can
//! be told apart without a network call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical error body, both as sent by the backend and as produced
/// locally through [`make_error`](crate::classify::make_error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
}

/// Errors returned by the client, the dispatcher and the upload path.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend handled the request and reported a domain failure.
    #[error("{}: {}", .0.error_code, .0.error_message)]
    Backend(ErrorObject),

    /// The request never produced a backend answer: network failure,
    /// non-2xx status without an error body, or an unparseable payload.
    #[error("not-server-error: {cause}")]
    NotServer { cause: String },

    /// No backend URL was configured, so nothing was sent.
    #[error("backend url is not set")]
    NoBackendUrl,

    /// An upload was requested with no file.
    #[error("no file selected")]
    NoFileSelected,

    /// The body parsed but is neither an error nor a success object (for
    /// example a bare number). Kept so the caller can inspect it.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(Value),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub const NOT_SERVER_ERROR: &'static str = "not-server-error";
    pub const NO_BACKEND_URL: &'static str = "no-backend-url";
    pub const NO_FILE_SELECTED: &'static str = "no-file-selected";
    pub const UNEXPECTED_RESPONSE: &'static str = "unexpected-response";
    pub const SERIALIZATION_ERROR: &'static str = "serialization-error";

    /// The `error_code` this failure is reported under.
    pub fn code(&self) -> &str {
        match self {
            ApiError::Backend(err) => &err.error_code,
            ApiError::NotServer { .. } => Self::NOT_SERVER_ERROR,
            ApiError::NoBackendUrl => Self::NO_BACKEND_URL,
            ApiError::NoFileSelected => Self::NO_FILE_SELECTED,
            ApiError::UnexpectedResponse(_) => Self::UNEXPECTED_RESPONSE,
            ApiError::Serialization(_) => Self::SERIALIZATION_ERROR,
        }
    }

    /// Human readable message, suitable for showing to an end user.
    pub fn message(&self) -> String {
        match self {
            ApiError::Backend(err) => err.error_message.clone(),
            ApiError::NotServer { .. } => "Please check your Internet.".to_string(),
            ApiError::NoBackendUrl => {
                "Server url is not set. Set backend_url in the client configuration.".to_string()
            }
            ApiError::NoFileSelected => "Please, select a file".to_string(),
            ApiError::UnexpectedResponse(_) => "The server returned an unexpected response.".to_string(),
            ApiError::Serialization(msg) => msg.clone(),
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        crate::classify::make_error(self.code(), &self.message())
    }

    /// True for failures the backend itself reported.
    pub fn is_backend(&self) -> bool {
        matches!(self, ApiError::Backend(_))
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::NotServer { cause: err.to_string() }
    }
}

/// Failures raised by a [`Transport`](crate::transport::Transport) before a
/// response could be read.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS failure, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The response arrived but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The request could not be turned into a wire request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

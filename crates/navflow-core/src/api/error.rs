use reqwest::StatusCode;
use thiserror::Error;

/// Failures at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}{}", message_suffix(.message))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// A replayed request was rejected again after a successful refresh.
    #[error("not authorized for this request")]
    Unauthorized,

    #[error("session expired; sign in again")]
    SessionExpired,

    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("not signed in")]
    NotSignedIn,
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

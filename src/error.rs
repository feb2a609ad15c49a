//! Client-side error model for the time-clock API.
//! One enum covers every failure the request pipeline can surface; helpers map it
//! to statuses and to the one-line text a front-end shows in a notification.

use serde::Deserialize;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Non-success response that is not handled by the 401 recovery path.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Http { status: u16, message: Option<String> },
    /// 401 that must not be recovered (login, refresh, or an already retried request).
    #[error("unauthorized: {}", message.as_deref().unwrap_or("no message"))]
    Unauthorized { message: Option<String> },
    /// The refresh procedure failed; all local auth state has been wiped.
    #[error("session expired")]
    SessionExpired,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Another clock action for the same employee has not completed yet.
    #[error("a clock action is already in progress")]
    ActionInFlight,
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Shape of the backend's error body. Only `message` is relied upon.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Extract a human-readable message from a raw response body, if any.
    pub(crate) fn message_from(bytes: &[u8]) -> Option<String> {
        if bytes.is_empty() { return None; }
        match serde_json::from_slice::<ErrorBody>(bytes) {
            Ok(b) => b.message.or(b.error).filter(|m| !m.trim().is_empty()),
            Err(_) => {
                let text = String::from_utf8_lossy(bytes).trim().to_string();
                // HTML error pages are not worth showing to a user
                if text.is_empty() || text.starts_with('<') { None } else { Some(text) }
            }
        }
    }
}

impl ApiError {
    pub fn http(status: u16, message: Option<String>) -> Self { ApiError::Http { status, message } }

    /// HTTP status associated with this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } | ApiError::SessionExpired => Some(401),
            ApiError::ActionInFlight => Some(409),
            ApiError::Transport(_) | ApiError::Decode(_) | ApiError::InvalidUrl(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool { self.status() == Some(404) }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. } | ApiError::SessionExpired)
    }

    /// Server-supplied message, if the backend sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Http { message, .. } | ApiError::Unauthorized { message } => message.as_deref(),
            _ => None,
        }
    }

    /// One-line text for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::SessionExpired => SESSION_EXPIRED.to_string(),
            ApiError::ActionInFlight => "Please wait for the current action to finish.".to_string(),
            ApiError::Transport(_) => "Unable to reach the server. Check your connection and try again.".to_string(),
            ApiError::Http { status: 403, message: None } => "You do not have permission to do that.".to_string(),
            ApiError::Http { status: 404, message: None } => "The requested item was not found.".to_string(),
            other => other.server_message().map(str::to_string).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http { status: status.as_u16(), message: None }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self { ApiError::Decode(err.to_string()) }
}

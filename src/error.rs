// Error handling module
// Defines the client error type and how error responses are turned into messages

use serde_json::Value;
use thiserror::Error;

/// Fallback message when the server sends no usable error body
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

/// Errors surfaced to callers of the client
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request could not be sent or its response could not be read
    #[error("Request failed: {0}")]
    Transport(String),

    /// Error response from the paraphrasing API
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Refresh path exhausted; the session was cleared and the client navigated to root
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Operation needs a stored session and there is none
    #[error("Not logged in")]
    NotAuthenticated,

    /// Input rejected before any request was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Session store failure
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Internal client error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Build an `Api` error from a non-2xx status and the raw response body.
    /// Uses the `message` (or `error`) field of a JSON body when present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .or_else(|| json.get("error"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());

        ApiError::Api { status, message }
    }

    /// Categorize a transport error for logs and messages
    pub fn from_transport(e: &reqwest::Error) -> Self {
        let error_kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else if e.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };

        ApiError::Transport(format!("{} (kind: {})", e, error_kind))
    }

    /// HTTP status of an `Api` error
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::Api {
            status: 429,
            message: "Rate limit exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 429 - Rate limit exceeded");

        let err = ApiError::SessionExpired;
        assert_eq!(err.to_string(), "Session expired, please log in again");

        let err = ApiError::Validation("Text is required".to_string());
        assert_eq!(err.to_string(), "Validation error: Text is required");
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[test]
    fn test_from_response_uses_message_field() {
        let err = ApiError::from_response(400, r#"{"message":"Text too long"}"#);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "API error: 400 - Text too long");
    }

    #[test]
    fn test_from_response_falls_back_to_error_field() {
        let err = ApiError::from_response(409, r#"{"error":"Email already registered"}"#);
        assert_eq!(err.to_string(), "API error: 409 - Email already registered");
    }

    #[test]
    fn test_from_response_without_json_body() {
        let err = ApiError::from_response(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "API error: 502 - An error occurred");

        let err = ApiError::from_response(500, "");
        assert_eq!(err.to_string(), "API error: 500 - An error occurred");

        let err = ApiError::from_response(500, r#"{"message":""}"#);
        assert_eq!(err.to_string(), "API error: 500 - An error occurred");
    }

    #[test]
    fn test_status_only_for_api_errors() {
        assert_eq!(ApiError::SessionExpired.status(), None);
        assert_eq!(ApiError::Transport("boom".into()).status(), None);
    }
}

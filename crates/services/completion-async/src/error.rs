use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when using the completion client
#[derive(Debug, Error)]
pub enum CompletionError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Non-success response from the gateway
    #[error("API error ({}): {}", status_label(.0), .0.message)]
    Api(ApiErrorObject),

    /// Attempt exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error (e.g., missing credentials)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Request rejected before any network call
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serde(String),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Every fallback attempt failed
    #[error("All {attempts} attempts failed; last error: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Failure of the final attempt
        last: Box<CompletionError>,
    },
}

fn status_label(obj: &ApiErrorObject) -> String {
    obj.status_code
        .map_or_else(|| "in-stream".to_string(), |s| s.to_string())
}

/// Coarse classification of a failure, for logging and user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 429
    RateLimited,
    /// 402
    PaymentRequired,
    /// 401 / 403
    Unauthorized,
    /// 404
    ModelUnavailable,
    /// Other 4xx
    BadRequest,
    /// 5xx
    Server,
    /// Attempt timed out
    Timeout,
    /// Connection or transport failure
    Network,
    /// Undecodable payload
    Malformed,
    /// Local configuration problem
    Config,
    /// Rejected input
    Validation,
    /// Caller cancelled
    Cancelled,
}

/// Error object returned by the gateway
///
/// OpenAI-compatible gateways wrap it as `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorObject {
    /// HTTP status code (absent for in-stream errors)
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Human-readable error message
    #[serde(default)]
    pub message: String,
    /// Provider error code, numeric or string
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    /// Error type string
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorObject,
}

impl CompletionError {
    /// Whether the standard exponential retry should repeat the request
    ///
    /// Used by the plain JSON endpoints; chat attempts use the model
    /// fallback policy instead.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(obj) => obj
                .status_code
                .is_some_and(crate::retry::is_retryable_status),
            Self::Reqwest(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) => true,
            Self::Config(_)
            | Self::Validation(_)
            | Self::Serde(_)
            | Self::Cancelled
            | Self::Exhausted { .. } => false,
        }
    }

    /// Whether this failure moves the fallback state machine forward
    ///
    /// Every service-side failure does; local problems and cancellation
    /// end the call immediately.
    #[must_use]
    pub const fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            Self::Reqwest(_) | Self::Api(_) | Self::Timeout(_) | Self::Serde(_)
        )
    }

    /// Classify the failure
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(obj) => match obj.status_code {
                Some(429) => ErrorKind::RateLimited,
                Some(402) => ErrorKind::PaymentRequired,
                Some(401 | 403) => ErrorKind::Unauthorized,
                Some(404) => ErrorKind::ModelUnavailable,
                Some(500..=599) | None => ErrorKind::Server,
                Some(_) => ErrorKind::BadRequest,
            },
            Self::Reqwest(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Reqwest(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Serde(_) => ErrorKind::Malformed,
            Self::Config(_) => ErrorKind::Config,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Exhausted { last, .. } => last.kind(),
        }
    }

    /// Short message suitable for showing to an end user
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::RateLimited => "The model is busy right now. Please try again in a moment.",
            ErrorKind::PaymentRequired => "The selected model needs credits on the gateway account.",
            ErrorKind::Unauthorized => "The completion API key was rejected.",
            ErrorKind::ModelUnavailable => "The selected model is not available.",
            ErrorKind::BadRequest => "The request was rejected by the model provider.",
            ErrorKind::Server => "The model provider had an internal error.",
            ErrorKind::Timeout => "The model took too long to respond.",
            ErrorKind::Network => "Could not reach the completion service.",
            ErrorKind::Malformed => "The model returned an unreadable response.",
            ErrorKind::Config => "The completion client is not configured.",
            ErrorKind::Validation => "The request is invalid.",
            ErrorKind::Cancelled => "The request was cancelled.",
        }
    }
}

/// Maps a serde deserialization error to a `CompletionError` with context
#[must_use]
pub fn map_deser(e: &serde_json::Error, body: &[u8]) -> CompletionError {
    let snippet = String::from_utf8_lossy(&body[..body.len().min(400)]).to_string();
    CompletionError::Serde(format!("{e}: {snippet}"))
}

/// Parses an in-body error envelope, if the payload is one
#[must_use]
pub fn parse_error_envelope(body: &[u8]) -> Option<ApiErrorObject> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|env| env.error)
}

/// Deserializes an API error from a non-success response body
///
/// Accepts the `{"error": {...}}` envelope, a bare error object, or plain text.
#[must_use]
pub fn deserialize_api_error(status: StatusCode, body: &[u8]) -> CompletionError {
    let status_code = Some(status.as_u16());

    if let Some(mut obj) = parse_error_envelope(body) {
        obj.status_code = status_code;
        return CompletionError::Api(obj);
    }
    if let Ok(mut obj) = serde_json::from_slice::<ApiErrorObject>(body)
        && !obj.message.is_empty()
    {
        obj.status_code = status_code;
        return CompletionError::Api(obj);
    }

    // Plain-text bodies are capped to keep logs small
    CompletionError::Api(ApiErrorObject {
        status_code,
        message: String::from_utf8_lossy(&body[..body.len().min(400)]).into_owned(),
        code: None,
        kind: Some(format!("http_{}", status.as_u16())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_error_is_parsed() {
        let body = br#"{"error": {"message": "Rate limit exceeded", "code": 429}}"#;
        let err = deserialize_api_error(StatusCode::TOO_MANY_REQUESTS, body);
        let CompletionError::Api(obj) = &err else {
            panic!("expected Api error, got {err:?}");
        };
        assert_eq!(obj.message, "Rate limit exceeded");
        assert_eq!(obj.status_code, Some(429));
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.is_retryable());
    }

    #[test]
    fn plain_text_is_capped() {
        let body = "x".repeat(1000);
        let err = deserialize_api_error(StatusCode::BAD_GATEWAY, body.as_bytes());
        let CompletionError::Api(obj) = &err else {
            panic!("expected Api error");
        };
        assert_eq!(obj.message.len(), 400);
        assert_eq!(obj.kind.as_deref(), Some("http_502"));
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[test]
    fn classification_matrix() {
        let api = |code| {
            CompletionError::Api(ApiErrorObject {
                status_code: Some(code),
                message: String::new(),
                code: None,
                kind: None,
            })
        };
        assert_eq!(api(402).kind(), ErrorKind::PaymentRequired);
        assert_eq!(api(401).kind(), ErrorKind::Unauthorized);
        assert_eq!(api(403).kind(), ErrorKind::Unauthorized);
        assert_eq!(api(404).kind(), ErrorKind::ModelUnavailable);
        assert_eq!(api(422).kind(), ErrorKind::BadRequest);
        assert_eq!(api(503).kind(), ErrorKind::Server);
        assert!(!api(404).is_retryable());
    }

    #[test]
    fn fallback_triggers() {
        assert!(CompletionError::Timeout(Duration::from_secs(1)).triggers_fallback());
        assert!(CompletionError::Serde("bad".into()).triggers_fallback());
        assert!(!CompletionError::Config("no key".into()).triggers_fallback());
        assert!(!CompletionError::Validation("empty".into()).triggers_fallback());
        assert!(!CompletionError::Cancelled.triggers_fallback());
    }

    #[test]
    fn exhausted_reports_last_kind() {
        let err = CompletionError::Exhausted {
            attempts: 3,
            last: Box::new(CompletionError::Timeout(Duration::from_secs(60))),
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().starts_with("All 3 attempts failed"));
    }
}

use reqwest::StatusCode;
use tracing::{error, info, warn};

use crate::models::BackendErrorBody;

/// Centralized error type for every client-side operation
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rejected by backend: {0}")]
    Rejected(String),

    #[error("Backend error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not logged in")]
    NoSession,

    #[error("Feature disabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }
}

impl ClientError {
    /// Local failures never reached the backend
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_)
                | ClientError::NoSession
                | ClientError::FeatureDisabled(_)
                | ClientError::Io(_)
        )
    }

    /// Log the error at a level matching its kind and hand it back
    pub fn logged(self, context: ErrorContext) -> Self {
        match &self {
            ClientError::Validation(_) | ClientError::FeatureDisabled(_) | ClientError::NoSession => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Request blocked locally"
                );
            }
            ClientError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
            }
            _ => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Backend request failed"
                );
            }
        }
        self
    }
}

/// Map a non-success status and its body to a structured error.
///
/// The backend answers failures with `{"error": "..."}`; anything else is
/// passed through as raw text.
pub fn classify_status(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<BackendErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        s if s.is_client_error() => ClientError::Rejected(message),
        s => ClientError::Server {
            status: s.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("load_class", "class").with_id("123");

        assert_eq!(context.operation, "load_class");
        assert_eq!(context.resource_type, "class");
        assert_eq!(context.resource_id, Some("123".to_string()));
    }

    #[test]
    fn test_status_classification() {
        let err = classify_status(StatusCode::UNAUTHORIZED, r#"{"error": "Invalid email or password"}"#);
        assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "Invalid email or password"));

        let err = classify_status(StatusCode::NOT_FOUND, r#"{"error": "Class not found"}"#);
        assert!(matches!(err, ClientError::NotFound(_)));

        let err = classify_status(StatusCode::BAD_REQUEST, "className is required");
        assert!(matches!(err, ClientError::Rejected(ref m) if m == "className is required"));

        let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(
            matches!(err, ClientError::Server { status: 500, ref message } if message == "Internal Server Error")
        );
    }

    #[test]
    fn test_local_errors() {
        assert!(ClientError::Validation("empty".to_string()).is_local());
        assert!(ClientError::NoSession.is_local());
        assert!(!ClientError::NotFound("x".to_string()).is_local());
    }
}

//! The error taxonomy every backend call resolves to.

use fleetgate_protocol::{ErrorBody, ProtocolError};
use fleetgate_session::SessionError;
use fleetgate_transport::{HttpResponse, TransportError};

/// Errors returned by calls made through the pipeline.
///
/// Status-derived variants carry the message to show the user: the
/// backend's `detail`/`message` when it sent one, otherwise the calling
/// operation's fallback text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response reached the client. Never triggers a logout.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response arrived but its body couldn't be decoded or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session store couldn't be read or written.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// 401 on a call the pipeline doesn't treat as a session (the login
    /// exchange, or a call made without a stored token).
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// 401 on an authenticated call. The session has already been
    /// cleared and the invalidation signal emitted; callers should not
    /// render this as an inline error.
    #[error("session invalidated")]
    SessionInvalidated,

    /// 400, 403, 422 and other client errors not listed separately.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// 409.
    #[error("conflict: {0}")]
    Conflict(String),

    /// 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Anything else, typically a 5xx.
    #[error("unexpected response {status}: {message}")]
    Unknown { status: u16, message: String },
}

impl ApiError {
    /// Classifies a non-success response.
    ///
    /// `fallback` is used when the body carries no usable message.
    pub fn from_response(response: &HttpResponse, fallback: &str) -> Self {
        let message = ErrorBody::parse(&response.body)
            .and_then(|body| body.message())
            .unwrap_or_else(|| fallback.to_string());
        match response.status {
            401 => Self::AuthRejected(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            400..=499 => Self::ValidationFailed(message),
            status => Self::Unknown { status, message },
        }
    }

    /// The text a form should show inline for this error.
    pub fn message(&self) -> String {
        match self {
            Self::AuthRejected(m)
            | Self::ValidationFailed(m)
            | Self::Conflict(m)
            | Self::NotFound(m)
            | Self::Unknown { message: m, .. } => m.clone(),
            Self::SessionInvalidated => {
                "Session expired. Please login again.".to_string()
            }
            Self::Transport(TransportError::Timeout) => {
                "The server took too long to respond. Please try again."
                    .to_string()
            }
            Self::Transport(_) => {
                "Unable to reach the server. Please try again.".to_string()
            }
            Self::Protocol(_) => {
                "Unexpected response from the server.".to_string()
            }
            Self::Session(_) => "Could not access the saved session.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body.as_bytes().to_vec())
    }

    #[test]
    fn test_from_response_401_is_auth_rejected_with_detail() {
        let err = ApiError::from_response(
            &response(401, r#"{"detail":"Incorrect username or password"}"#),
            "Login failed",
        );
        assert!(
            matches!(&err, ApiError::AuthRejected(m) if m == "Incorrect username or password")
        );
    }

    #[test]
    fn test_from_response_without_detail_uses_fallback() {
        let err = ApiError::from_response(&response(401, ""), "Login failed");
        assert_eq!(err.message(), "Login failed");
    }

    #[test]
    fn test_from_response_422_validation_items() {
        let err = ApiError::from_response(
            &response(
                422,
                r#"{"detail":[{"loc":["body","password"],"msg":"Password must be at least 8 characters long"}]}"#,
            ),
            "Registration failed",
        );
        assert!(matches!(err, ApiError::ValidationFailed(_)));
        assert_eq!(err.message(), "Password must be at least 8 characters long");
    }

    #[test]
    fn test_from_response_status_mapping() {
        let cases = [
            (400, "validation"),
            (403, "validation"),
            (404, "not_found"),
            (409, "conflict"),
            (500, "unknown"),
            (503, "unknown"),
        ];
        for (status, expected) in cases {
            let err = ApiError::from_response(&response(status, "{}"), "x");
            let kind = match err {
                ApiError::ValidationFailed(_) => "validation",
                ApiError::NotFound(_) => "not_found",
                ApiError::Conflict(_) => "conflict",
                ApiError::Unknown { .. } => "unknown",
                _ => "other",
            };
            assert_eq!(kind, expected, "status {status}");
        }
    }

    #[test]
    fn test_message_transport_error_is_generic() {
        let err = ApiError::from(TransportError::Unreachable("refused".into()));
        assert_eq!(err.message(), "Unable to reach the server. Please try again.");
    }
}

/// Errors that can occur in the transport layer.
///
/// Every variant means the same thing to callers: no HTTP response made it
/// back. Status codes, including 401, are never transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The base URL or the request path could not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The backend could not be reached (DNS, refused, reset, TLS).
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The response head arrived but reading the body failed.
    #[error("failed to read response body: {0}")]
    Body(String),
}

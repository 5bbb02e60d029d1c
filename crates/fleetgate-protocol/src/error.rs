//! Error types for the protocol layer.
//!
//! Each Fleetgate crate defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the shape of a payload, not in the
//! network or in the session.

/// Errors that can occur while encoding or decoding payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: the backend answered with HTML from a proxy, a
    /// required field is missing, or the body was truncated.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload decoded but violates a protocol rule, such as an
    /// empty `access_token`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

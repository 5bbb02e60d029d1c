//! Codec trait and helpers for serializing request and response bodies.
//!
//! The backend speaks two body encodings:
//!
//! - JSON for everything except the token exchange ([`JsonCodec`])
//! - `application/x-www-form-urlencoded` for `POST /token`
//!   ([`encode_form`]), because the backend follows the OAuth2 password
//!   flow form convention.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Content type for form-encoded bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// - `Send + Sync` → a single codec is shared by every in-flight request.
/// - `'static` → the codec owns everything it needs.
pub trait Codec: Send + Sync + 'static {
    /// The `Content-Type` header value for bodies produced by this codec.
    fn content_type(&self) -> &'static str;

    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use fleetgate_protocol::{Codec, JsonCodec, NewUser};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&NewUser::new("a@b.com", "hunter22")).unwrap();
/// assert_eq!(bytes, br#"{"email":"a@b.com","password":"hunter22"}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Form encoding
// ---------------------------------------------------------------------------

/// Encodes name/value pairs as an `application/x-www-form-urlencoded` body.
///
/// Reserved characters are percent-encoded and spaces become `+`, so an
/// email like `a@b.com` travels as `a%40b.com`.
pub fn encode_form(pairs: &[(&str, &str)]) -> Vec<u8> {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
        .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TokenResponse, User, UserId};

    #[test]
    fn test_json_decode_user() {
        let user: User = JsonCodec
            .decode(br#"{"id":1,"email":"a@b.com","is_admin":false}"#)
            .unwrap();
        assert_eq!(user.id, UserId(1));
        assert_eq!(user.email, "a@b.com");
    }

    #[test]
    fn test_json_decode_garbage_returns_decode_error() {
        let result: Result<TokenResponse, _> =
            JsonCodec.decode(b"<html>bad gateway</html>");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_form_escapes_reserved_characters() {
        let body =
            encode_form(&[("username", "a@b.com"), ("password", "p w&x")]);
        assert_eq!(body, b"username=a%40b.com&password=p+w%26x");
    }

    #[test]
    fn test_encode_form_empty_pairs() {
        assert!(encode_form(&[]).is_empty());
    }
}

//! Payload types for the fleet backend's auth endpoints.
//!
//! Everything here is a plain value that is serialized onto the wire or
//! parsed from it. The CRUD resources (buses, routes) are deliberately
//! absent: the client passes them through as opaque JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::encode_form;
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// An opaque bearer credential issued by `POST /token`.
///
/// The value is never printed: `Debug` shows `Token(***)` so a token can't
/// leak into logs through a stray `{:?}`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps a raw credential string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw credential.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `Authorization` header value for this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Extracts the token from an `Authorization: Bearer <token>` value.
    ///
    /// The scheme is matched case-insensitively. Returns `None` for other
    /// schemes or an empty credential.
    pub fn from_bearer(header: &str) -> Option<Self> {
        let (scheme, value) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let value = value.trim();
        (!value.is_empty()).then(|| Self::new(value))
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Successful body of `POST /token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: Token,
    /// Always `"bearer"` from this backend; optional on the wire.
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Validates and returns the issued token.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the token is empty or
    /// the token type is something other than bearer.
    pub fn into_token(self) -> Result<Token, ProtocolError> {
        if let Some(kind) = &self.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(ProtocolError::InvalidMessage(format!(
                    "unsupported token type {kind:?}"
                )));
            }
        }
        if self.access_token.as_str().trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "empty access token".into(),
            ));
        }
        Ok(self.access_token)
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Backend identifier of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

/// The account returned by `GET /users/me` and `POST /users/`.
///
/// Only `id` and `email` matter to the session layer. Whatever else the
/// backend sends (`is_active`, `is_admin`, `created_at`, ...) is kept
/// untouched in `profile` so the UI can still read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(flatten)]
    pub profile: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Creates a user with an empty profile.
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            email: email.into(),
            profile: serde_json::Map::new(),
        }
    }

    /// Reads a boolean profile flag such as `is_admin`.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.profile.get(name).and_then(serde_json::Value::as_bool)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Login credentials for the token exchange.
///
/// The backend's form fields are `username` and `password`; the username
/// is the account email.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: email.into(),
            password: password.into(),
        }
    }

    /// Encodes the credentials as a form body.
    pub fn to_form(&self) -> Vec<u8> {
        encode_form(&[
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ])
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Registration payload for `POST /users/`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Error bodies
// ---------------------------------------------------------------------------

/// The backend's error payload.
///
/// FastAPI-style backends answer with `{"detail": "..."}` for handled
/// errors and `{"detail": [{"loc": [...], "msg": "..."}]}` for request
/// validation failures. Some proxies answer with `{"message": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `detail` field in either of its shapes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Items(Vec<DetailItem>),
    Other(serde_json::Value),
}

/// One entry of a validation-error `detail` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetailItem {
    pub msg: String,
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
}

impl ErrorBody {
    /// Parses an error body, returning `None` if it isn't JSON of the
    /// expected shape. Error bodies are best effort: a proxy's HTML page
    /// is not a protocol error, it just has no message.
    pub fn parse(data: &[u8]) -> Option<Self> {
        serde_json::from_slice(data).ok()
    }

    /// Flattens the body into one human-readable message, if it has one.
    ///
    /// Validation item messages are joined with `"; "`.
    pub fn message(&self) -> Option<String> {
        let from_detail = match &self.detail {
            Some(ErrorDetail::Text(text)) => Some(text.trim().to_string()),
            Some(ErrorDetail::Items(items)) => Some(
                items
                    .iter()
                    .map(|item| item.msg.trim())
                    .filter(|msg| !msg.is_empty())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Some(ErrorDetail::Other(_)) | None => None,
        };
        from_detail
            .filter(|m| !m.is_empty())
            .or_else(|| {
                self.message
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
            })
    }
}

//! HTTP transport abstraction for Fleetgate.
//!
//! Provides the [`HttpTransport`] trait plus the plain request/response
//! values that travel through it. Everything above this crate (the
//! middleware pipeline, the auth service) talks to the backend only via
//! this trait, so tests can swap in a scripted transport.
//!
//! # Feature Flags
//!
//! - `reqwest` (default) — [`ReqwestTransport`] backed by `reqwest`
//! - `test-util` — [`ScriptedTransport`], a canned-response transport for
//!   tests of the layers above

mod error;
#[cfg(feature = "reqwest")]
mod http_client;
#[cfg(feature = "test-util")]
mod scripted;

pub use error::TransportError;
#[cfg(feature = "reqwest")]
pub use http_client::ReqwestTransport;
#[cfg(feature = "test-util")]
pub use scripted::ScriptedTransport;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Name of the header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Name of the header describing the request body encoding.
pub const CONTENT_TYPE: &str = "Content-Type";

/// HTTP verbs used by the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns the canonical upper-case verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request, relative to the transport's base origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// The HTTP verb.
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `/users/me`.
    pub path: String,
    /// Query string parameters, in order.
    pub query: Vec<(String, String)>,
    /// Request headers. Names are matched case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes, already encoded.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers, query, or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends a query parameter.
    pub fn with_query(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a header, replacing any existing header with the same name.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set_header(name, value);
        self
    }

    /// Attaches an encoded body and its content type.
    pub fn with_body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.set_header(CONTENT_TYPE, content_type);
        self.body = Some(body);
        self
    }

    /// Sets a header in place, replacing any existing header with the
    /// same (case-insensitive) name.
    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as received from the backend. Any status, including
/// errors, is a successful transport round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the given status and body, no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(
    headers: &'a [(String, String)],
    name: &str,
) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Sends one request and waits for its response.
///
/// Implementations must not interpret status codes: a 401 or a 500 is an
/// `Ok(HttpResponse)`. Only a missing response is an error.
pub trait HttpTransport: Send + Sync + 'static {
    /// Performs a single round trip.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        T::send(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut req = HttpRequest::get("/users/me")
            .with_header("authorization", "Bearer old");

        req.set_header(AUTHORIZATION, "Bearer new");

        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer new"));
    }

    #[test]
    fn test_header_missing_returns_none() {
        let req = HttpRequest::get("/buses/");
        assert!(req.header(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_with_body_sets_content_type() {
        let req = HttpRequest::post("/token")
            .with_body("application/x-www-form-urlencoded", b"a=b".to_vec());

        assert_eq!(
            req.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(req.body.as_deref(), Some(&b"a=b"[..]));
    }

    #[test]
    fn test_with_query_preserves_order() {
        let req = HttpRequest::get("/buses/")
            .with_query("skip", "0")
            .with_query("limit", "100");

        assert_eq!(
            req.query,
            vec![
                ("skip".to_string(), "0".to_string()),
                ("limit".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn test_response_is_success_boundaries() {
        assert!(HttpResponse::new(200, Vec::new()).is_success());
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(!HttpResponse::new(199, Vec::new()).is_success());
        assert!(!HttpResponse::new(300, Vec::new()).is_success());
        assert!(!HttpResponse::new(401, Vec::new()).is_success());
    }
}

//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use url::Url;

use crate::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

/// A [`HttpTransport`] that sends requests to a single base origin.
///
/// Cloning is cheap: `reqwest::Client` is reference counted internally
/// and shares its connection pool between clones.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport for the given base URL with no request timeout.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, None)
    }

    /// Creates a transport with an optional per-request timeout.
    ///
    /// A base URL with a path (e.g. `https://host/api`) is kept as a
    /// prefix for every request path.
    pub fn with_timeout(
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(format!(
                "{base_url} cannot be a base url"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        tracing::debug!(%base_url, ?timeout, "HTTP transport ready");
        Ok(Self { client, base_url })
    }

    /// Returns the normalized base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, request: &HttpRequest) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                error = %e,
                "request failed before a response arrived"
            );
            map_send_error(&e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            "response received"
        );

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn map_send_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::InvalidUrl(e.to_string())
    } else {
        TransportError::Unreachable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_trailing_slash_to_base() {
        let transport =
            ReqwestTransport::new("http://localhost:8000/api").unwrap();
        assert_eq!(transport.base_url().as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn test_new_rejects_garbage_url() {
        let result = ReqwestTransport::new("not a url");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_keeps_base_prefix_and_query() {
        let transport =
            ReqwestTransport::new("http://localhost:8000/api").unwrap();
        let request = HttpRequest::get("/buses/")
            .with_query("skip", "10")
            .with_query("limit", "5");

        let url = transport.resolve(&request).unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/buses/?skip=10&limit=5"
        );
    }

    #[test]
    fn test_resolve_root_origin() {
        let transport = ReqwestTransport::new("http://localhost:8000").unwrap();
        let url = transport.resolve(&HttpRequest::get("/users/me")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/users/me");
    }
}

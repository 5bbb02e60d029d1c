//! The API client every backend call goes through.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use fleetgate_protocol::{Codec, JsonCodec, FORM_CONTENT_TYPE};
use fleetgate_session::SessionStore;
use fleetgate_transport::{HttpRequest, HttpResponse, HttpTransport};

use crate::{ApiError, BearerAuth, Pipeline, SessionGuard, SessionSignal};

const DEFAULT_FALLBACK: &str = "Request failed";

/// Sends typed requests to the backend.
///
/// Holds two pipelines over one shared transport:
///
/// - the **authenticated** pipeline attaches the stored bearer token and
///   runs the 401 session guard; used for everything by default
/// - the **raw** pipeline has no stages; used for the token exchange,
///   where a 401 means "wrong password", not "session expired"
///
/// Non-2xx responses are classified with [`ApiError::from_response`];
/// `fallback` is the message used when the backend didn't send one.
pub struct ApiClient<T> {
    authed: Pipeline<T>,
    raw: Pipeline<T>,
    store: Arc<SessionStore>,
    signal: SessionSignal,
    codec: JsonCodec,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<SessionStore>,
        signal: SessionSignal,
    ) -> Self {
        let authed = Pipeline::new(Arc::clone(&transport))
            .with_request_stage(BearerAuth::new(Arc::clone(&store)))
            .with_response_stage(SessionGuard::new(
                Arc::clone(&store),
                signal.clone(),
            ));
        let raw = Pipeline::new(transport);
        Self {
            authed,
            raw,
            store,
            signal,
            codec: JsonCodec,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn signal(&self) -> &SessionSignal {
        &self.signal
    }

    pub fn transport(&self) -> &Arc<T> {
        self.authed.transport()
    }

    /// Attaches `value` as a JSON body.
    pub fn json_body<B: Serialize>(
        &self,
        request: HttpRequest,
        value: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = self.codec.encode(value)?;
        Ok(request.with_body(self.codec.content_type(), body))
    }

    /// Attaches a form-encoded body.
    pub fn form_body(request: HttpRequest, body: Vec<u8>) -> HttpRequest {
        request.with_body(FORM_CONTENT_TYPE, body)
    }

    /// Sends an authenticated request and decodes a 2xx JSON body.
    pub async fn request<R: DeserializeOwned>(
        &self,
        request: HttpRequest,
        fallback: &str,
    ) -> Result<R, ApiError> {
        let response = self.authed.execute(request).await?;
        self.decode(response, fallback)
    }

    /// Sends an authenticated request whose success carries no body
    /// worth reading (e.g. `204 No Content`).
    pub async fn request_empty(
        &self,
        request: HttpRequest,
        fallback: &str,
    ) -> Result<(), ApiError> {
        let response = self.authed.execute(request).await?;
        check(&response, fallback)
    }

    /// Sends a request with no bearer token and no session guard.
    pub async fn request_raw<R: DeserializeOwned>(
        &self,
        request: HttpRequest,
        fallback: &str,
    ) -> Result<R, ApiError> {
        let response = self.raw.execute(request).await?;
        self.decode(response, fallback)
    }

    fn decode<R: DeserializeOwned>(
        &self,
        response: HttpResponse,
        fallback: &str,
    ) -> Result<R, ApiError> {
        check(&response, fallback)?;
        Ok(self.codec.decode(&response.body)?)
    }

    // -- Convenience wrappers ----------------------------------------------

    pub async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<R, ApiError> {
        self.request(HttpRequest::get(path), DEFAULT_FALLBACK).await
    }

    pub async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let request = self.json_body(HttpRequest::post(path), body)?;
        self.request(request, DEFAULT_FALLBACK).await
    }

    pub async fn put_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let request = self.json_body(HttpRequest::put(path), body)?;
        self.request(request, DEFAULT_FALLBACK).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request_empty(HttpRequest::delete(path), DEFAULT_FALLBACK)
            .await
    }

    /// POSTs a form body on the raw path.
    pub async fn post_form_raw<R: DeserializeOwned>(
        &self,
        path: &str,
        form: Vec<u8>,
        fallback: &str,
    ) -> Result<R, ApiError> {
        let request = Self::form_body(HttpRequest::post(path), form);
        self.request_raw(request, fallback).await
    }
}

fn check(response: &HttpResponse, fallback: &str) -> Result<(), ApiError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(ApiError::from_response(response, fallback))
    }
}

impl<T> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("authed", &self.authed)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

//! Request and response stages.
//!
//! A stage is one step a call passes through on its way out or back in.
//! Request stages may rewrite the outbound request; response stages see
//! the request that was actually sent alongside the response, and may
//! pass the response on or turn it into an error.

use std::sync::Arc;

use fleetgate_protocol::Token;
use fleetgate_session::SessionStore;
use fleetgate_transport::{HttpRequest, HttpResponse, AUTHORIZATION};

use crate::{ApiError, SessionSignal};

/// Runs on every outbound request before it is sent.
pub trait RequestStage: Send + Sync + 'static {
    fn on_request(&self, request: &mut HttpRequest) -> Result<(), ApiError>;
}

/// Runs on every response, in registration order.
pub trait ResponseStage: Send + Sync + 'static {
    fn on_response(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, ApiError>;
}

// ---------------------------------------------------------------------------
// BearerAuth
// ---------------------------------------------------------------------------

/// Attaches `Authorization: Bearer <token>` when the store holds a token.
///
/// The token is read at the moment the request goes out, so a request
/// issued right after a login carries the new token.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    store: Arc<SessionStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }
}

impl RequestStage for BearerAuth {
    fn on_request(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        if let Some(token) = self.store.get()? {
            request.set_header(AUTHORIZATION, token.bearer());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SessionGuard
// ---------------------------------------------------------------------------

/// Turns a 401 on an authenticated request into a forced logout.
///
/// The guard clears the session only if it still holds the token the
/// rejected request carried, and emits the invalidation signal only when
/// that clear actually happened. A burst of 401s for one token therefore
/// produces one logout, and a late 401 for a replaced token leaves the
/// new session alone.
///
/// A 401 on a request that carried no bearer token is not a session
/// problem and passes through untouched.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    store: Arc<SessionStore>,
    signal: SessionSignal,
}

impl SessionGuard {
    pub fn new(store: Arc<SessionStore>, signal: SessionSignal) -> Self {
        Self { store, signal }
    }
}

impl ResponseStage for SessionGuard {
    fn on_response(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, ApiError> {
        if response.status != 401 {
            return Ok(response);
        }
        let Some(sent) = request.header(AUTHORIZATION).and_then(Token::from_bearer)
        else {
            return Ok(response);
        };

        if self.store.clear_if(&sent)? {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                "authenticated request rejected, logging out"
            );
            self.signal.invalidate();
        } else {
            tracing::debug!(
                path = %request.path,
                "401 for a session that is already gone"
            );
        }
        Err(ApiError::SessionInvalidated)
    }
}

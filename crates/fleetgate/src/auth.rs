//! The three backend calls behind authentication.

use std::sync::Arc;

use fleetgate_pipeline::{ApiClient, ApiError};
use fleetgate_protocol::{Credentials, NewUser, Token, TokenResponse, User};
use fleetgate_transport::{HttpRequest, HttpTransport};

/// Token exchange endpoint (OAuth2 password flow).
pub const TOKEN_PATH: &str = "/token";
/// Account creation endpoint.
pub const USERS_PATH: &str = "/users/";
/// The account the current bearer token belongs to.
pub const CURRENT_USER_PATH: &str = "/users/me";

const LOGIN_FALLBACK: &str = "Login failed";
const REGISTER_FALLBACK: &str = "Registration failed";
const CURRENT_USER_FALLBACK: &str = "Could not load the current user";

/// Stateless wrapper over the auth endpoints.
///
/// Nothing here reads or writes the session store directly: the token
/// exchange goes through the raw pipeline, the other two calls through the
/// authenticated one. Keeping the session in sync is the job of
/// [`AuthManager`](crate::AuthManager).
pub struct AuthService<T> {
    api: Arc<ApiClient<T>>,
}

impl<T: HttpTransport> AuthService<T> {
    pub fn new(api: Arc<ApiClient<T>>) -> Self {
        Self { api }
    }

    /// Exchanges credentials for a bearer token.
    ///
    /// Sent without any stored token, so a 401 here is
    /// [`ApiError::AuthRejected`] ("Incorrect username or password"), never
    /// a forced logout.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Token, ApiError> {
        let credentials = Credentials::new(email, password);
        let response: TokenResponse = self
            .api
            .post_form_raw(TOKEN_PATH, credentials.to_form(), LOGIN_FALLBACK)
            .await?;
        let token = response.into_token()?;
        tracing::debug!(email, "token issued");
        Ok(token)
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, new_user: &NewUser) -> Result<User, ApiError> {
        let request = self.api.json_body(HttpRequest::post(USERS_PATH), new_user)?;
        let user: User = self.api.request(request, REGISTER_FALLBACK).await?;
        tracing::info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    /// Loads the account of the stored token.
    pub async fn fetch_current_user(&self) -> Result<User, ApiError> {
        self.api
            .request(HttpRequest::get(CURRENT_USER_PATH), CURRENT_USER_FALLBACK)
            .await
    }
}

impl<T> Clone for AuthService<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<T> std::fmt::Debug for AuthService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

//! The auth state machine.
//!
//! `AuthManager` is the one place that turns backend results into the
//! application's view of "who is logged in". It publishes an [`AuthState`]
//! through a `tokio::sync::watch` channel: observers always see the latest
//! state and can await changes.
//!
//! ## Lifecycle
//!
//! ```text
//! initialize() ──▶ [Loading] ──┬── no token / token rejected ──▶ [Unauthenticated]
//!                              └── user loaded ───────────────▶ [Authenticated(user)]
//!
//! login() ──▶ [Loading] ──┬── credentials rejected ──▶ [Failed(reason)]
//!                         ├── user not loaded ───────▶ [Unauthenticated]
//!                         └── user loaded ───────────▶ [Authenticated(user)]
//!
//! logout() ──▶ [Unauthenticated]
//! ```
//!
//! A forced logout from the pipeline (401 on any authenticated call)
//! moves any state to `Unauthenticated`, unless a newer session has been
//! stored since. There is no terminal state.
//! Concurrent flows are not serialized: the last one to publish wins.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use fleetgate_pipeline::{ApiError, SessionEvent};
use fleetgate_protocol::{NewUser, Token, User};
use fleetgate_session::{SessionError, SessionStore};
use fleetgate_transport::HttpTransport;

use crate::AuthService;

/// What the application knows about the current user.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// A validation or login is in flight.
    Loading,
    /// No session.
    Unauthenticated,
    /// A session whose user has been loaded.
    Authenticated(User),
    /// The last login attempt was rejected. Carries the message to show.
    Failed(String),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated(_) => "authenticated",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives login, logout and startup validation.
pub struct AuthManager<T> {
    service: AuthService<T>,
    store: Arc<SessionStore>,
    state: watch::Sender<AuthState>,
}

impl<T: HttpTransport> AuthManager<T> {
    /// Creates a manager in the `Loading` state. Call
    /// [`initialize`](Self::initialize) to settle it.
    pub fn new(service: AuthService<T>, store: Arc<SessionStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            service,
            store,
            state,
        }
    }

    /// The current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn service(&self) -> &AuthService<T> {
        &self.service
    }

    fn publish(&self, next: AuthState) {
        let to = next.name();
        let previous = self.state.send_replace(next);
        tracing::debug!(from = previous.name(), to, "auth state");
    }

    /// Restores the session left by a previous run.
    ///
    /// With no stored token this settles on `Unauthenticated` without
    /// touching the network. Otherwise the token is validated by loading
    /// its user; any failure clears the token.
    pub async fn initialize(&self) -> AuthState {
        let token = match self.store.get() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored session");
                None
            }
        };
        let Some(token) = token else {
            self.publish(AuthState::Unauthenticated);
            return self.state();
        };

        self.publish(AuthState::Loading);
        match self.service.fetch_current_user().await {
            Ok(user) => self.settle_authenticated(&token, user),
            Err(e) => {
                tracing::info!(error = %e, "stored session rejected");
                self.discard(&token);
                self.publish(AuthState::Unauthenticated);
            }
        }
        self.state()
    }

    /// Logs in and loads the account.
    ///
    /// The token is stored before the account is requested, so the
    /// request carries it. If the credentials are rejected the store is
    /// left as it was and the state becomes `Failed`. If the account can't
    /// be loaded the new token is discarded and the state becomes
    /// `Unauthenticated`.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        self.publish(AuthState::Loading);

        let token = match self.service.login(email, password).await {
            Ok(token) => token,
            Err(e) => {
                tracing::info!(email, error = %e, "login rejected");
                self.publish(AuthState::Failed(e.message()));
                return Err(e);
            }
        };
        if let Err(e) = self.store.set(&token) {
            let e = ApiError::from(e);
            self.publish(AuthState::Failed(e.message()));
            return Err(e);
        }

        match self.service.fetch_current_user().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "logged in");
                self.settle_authenticated(&token, user.clone());
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token issued but user could not be loaded");
                self.discard(&token);
                self.publish(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Creates an account. Leaves the state and the session alone.
    pub async fn register(&self, new_user: &NewUser) -> Result<User, ApiError> {
        self.service.register(new_user).await
    }

    /// Ends the session. Safe to call in any state, any number of times.
    ///
    /// The state becomes `Unauthenticated` even if the stored token could
    /// not be removed; the storage error is returned.
    pub fn logout(&self) -> Result<(), SessionError> {
        let cleared = self.store.clear();
        if let Err(e) = &cleared {
            tracing::warn!(error = %e, "could not clear stored session");
        }
        self.publish(AuthState::Unauthenticated);
        tracing::info!("logged out");
        cleared
    }

    /// Reacts to an event from the pipeline's session signal.
    ///
    /// An invalidation only applies while the store is still empty. If a
    /// new session was stored after the rejected one was cleared, the
    /// event is stale and the current state stands.
    pub fn on_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Invalidated { .. } => match self.store.get() {
                Ok(Some(_)) => {
                    tracing::debug!("ignoring invalidation of a replaced session");
                }
                _ => {
                    tracing::info!(from = %self.state(), "session invalidated by backend");
                    self.publish(AuthState::Unauthenticated);
                }
            },
        }
    }

    // Publishes `Authenticated` only while `token` is still the stored
    // token. If a logout or forced logout got there first, its state
    // stands.
    fn settle_authenticated(&self, token: &Token, user: User) {
        match self.store.cache_user(token, &user) {
            Ok(true) => self.publish(AuthState::Authenticated(user)),
            Ok(false) => {
                tracing::debug!("session ended while loading user");
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not cache user");
                if matches!(self.store.get(), Ok(Some(current)) if &current == token) {
                    self.publish(AuthState::Authenticated(user));
                }
            }
        }
    }

    fn discard(&self, token: &Token) {
        if let Err(e) = self.store.clear_if(token) {
            tracing::warn!(error = %e, "could not clear rejected session");
        }
    }
}

impl<T> fmt::Debug for AuthManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthManager")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

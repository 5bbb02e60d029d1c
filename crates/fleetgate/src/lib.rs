//! # Fleetgate
//!
//! Session and authentication client for the fleet-management backend.
//!
//! Fleetgate owns the bearer-token lifecycle: it stores the token, attaches
//! it to every backend call, logs the user out when the backend rejects
//! it, and publishes who is logged in as an observable [`AuthState`].
//! Screens, forms and routing stay in the application; they call
//! [`AuthManager`] and react to [`SessionEvent`]s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetgate::prelude::*;
//!
//! # async fn run() -> Result<(), FleetError> {
//! let client = FleetClient::builder()
//!     .config(ClientConfig::from_env()?)
//!     .build()?;
//!
//! let mut events = client.session_events();
//! tokio::spawn(async move {
//!     while let Ok(SessionEvent::Invalidated { login_path }) = events.recv().await {
//!         // show the login screen at `login_path`
//!     }
//! });
//!
//! if !client.start().await.is_authenticated() {
//!     client.auth().login("a@b.com", "secret").await?;
//! }
//! let buses = client.resources().list(Resource::Buses, Page::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! FleetClient ─▶ AuthManager ─▶ AuthService ─┐
//!            └─▶ Resources ──────────────────┴─▶ ApiClient ─▶ HttpTransport
//!                                                  │
//!                                            SessionStore
//! ```

mod auth;
mod client;
mod config;
mod error;
mod manager;
mod resources;

pub use auth::{AuthService, CURRENT_USER_PATH, TOKEN_PATH, USERS_PATH};
pub use client::{FleetClient, FleetClientBuilder};
pub use config::{
    ClientConfig, ENV_API_URL, ENV_LOGIN_PATH, ENV_SESSION_FILE,
    ENV_TIMEOUT_SECS,
};
pub use error::FleetError;
pub use manager::{AuthManager, AuthState};
pub use resources::{Page, Resource, Resources};

pub use fleetgate_pipeline as pipeline;
pub use fleetgate_protocol as protocol;
pub use fleetgate_session as session;
pub use fleetgate_transport as transport;

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::{
        AuthManager, AuthState, ClientConfig, FleetClient, FleetClientBuilder,
        FleetError, Page, Resource, Resources,
    };
    pub use fleetgate_pipeline::{ApiError, SessionEvent};
    pub use fleetgate_protocol::{NewUser, Token, User, UserId};
    pub use fleetgate_session::{FileStorage, MemoryStorage, Storage};
}

pub use fleetgate_pipeline::{ApiError, SessionEvent};

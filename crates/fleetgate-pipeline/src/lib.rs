//! Authenticated HTTP pipeline for Fleetgate.
//!
//! Every call to the backend passes through here. The pipeline attaches
//! the stored bearer token on the way out and watches for 401s on the
//! way back; a rejected session is cleared and announced through a
//! [`SessionSignal`] so the application can send the user to the login
//! screen.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  fleetgate (AuthService, AuthManager, ...)   │
//! ├──────────────────────────────────────────────┤
//! │  fleetgate-pipeline                          │
//! │    ApiClient ─▶ Pipeline                     │
//! │      BearerAuth    (request stage)           │
//! │      SessionGuard  (response stage) ─▶ SessionSignal
//! ├──────────────────────────────────────────────┤
//! │  fleetgate-session   │  fleetgate-transport  │
//! └──────────────────────────────────────────────┘
//! ```

mod client;
mod error;
mod pipeline;
mod signal;
mod stage;

pub use client::ApiClient;
pub use error::ApiError;
pub use pipeline::Pipeline;
pub use signal::{SessionEvent, SessionSignal};
pub use stage::{BearerAuth, RequestStage, ResponseStage, SessionGuard};

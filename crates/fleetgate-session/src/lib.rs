//! Session storage for Fleetgate.
//!
//! This crate holds the one piece of state that outlives a process: the
//! bearer token (and the user identity cached alongside it).
//!
//! 1. **Storage** — a durable key-value boundary ([`Storage`] trait), with
//!    an in-memory ([`MemoryStorage`]) and an on-disk ([`FileStorage`])
//!    backend.
//! 2. **Session store** — the token contract on top of it
//!    ([`SessionStore`]): `get`, `set`, `clear`, plus the compare-and-clear
//!    the HTTP pipeline uses to invalidate a rejected session exactly once.
//!
//! # How it fits in the stack
//!
//! ```text
//! Auth state machine (above)  ← writes the token after login, clears on logout
//!     ↕
//! HTTP pipeline (above)  ← reads the token per request, clears it on 401
//!     ↕
//! Session Layer (this crate)  ← no network, no validation, just storage
//! ```

mod error;
mod storage;
mod store;

pub use error::SessionError;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{SessionStore, TOKEN_KEY, USER_KEY};

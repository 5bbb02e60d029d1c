//! Wire protocol for the Fleetgate backend API.
//!
//! This crate defines the "language" the client and the fleet backend
//! speak over HTTP:
//!
//! - **Types** ([`Token`], [`User`], [`Credentials`], [`NewUser`],
//!   [`TokenResponse`]) — the payloads that travel on the wire.
//! - **Error bodies** ([`ErrorBody`]) — the backend's `detail`/`message`
//!   error shape, flattened into one user-facing string.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`encode_form`]) — how
//!   payloads are converted to and from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about connections, tokens in storage,
//! or auth state. It only knows how payloads look.
//!
//! ```text
//! Transport (bytes) → Protocol (typed payloads) → Pipeline / Auth
//! ```

mod codec;
mod error;
mod types;

pub use codec::{encode_form, Codec, JsonCodec, FORM_CONTENT_TYPE};
pub use error::ProtocolError;
pub use types::{
    Credentials, DetailItem, ErrorBody, ErrorDetail, NewUser, Token,
    TokenResponse, User, UserId,
};

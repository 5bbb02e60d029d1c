//! Unified error type for Fleetgate.

use fleetgate_pipeline::ApiError;
use fleetgate_protocol::ProtocolError;
use fleetgate_session::SessionError;
use fleetgate_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Backend calls themselves return [`ApiError`]; this type is what setup
/// code (building a client, opening the session file) returns, and what an
/// application can funnel everything into with `?`.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// The transport could not be built or a request never got a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session storage could not be opened, read or written.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Unreachable("connection refused".into());
        let fleet_err: FleetError = err.into();
        assert!(matches!(fleet_err, FleetError::Transport(_)));
        assert!(fleet_err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let fleet_err: FleetError = err.into();
        assert!(matches!(fleet_err, FleetError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::Storage(std::io::Error::other("disk full"));
        let fleet_err: FleetError = err.into();
        assert!(matches!(fleet_err, FleetError::Session(_)));
    }

    #[test]
    fn test_from_api_error() {
        let err = ApiError::Conflict("Email already registered".into());
        let fleet_err: FleetError = err.into();
        assert!(matches!(fleet_err, FleetError::Api(_)));
        assert!(fleet_err.to_string().contains("Email already registered"));
    }
}

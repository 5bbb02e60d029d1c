//! Error types for the session layer.

/// Errors that can occur while reading or writing the session store.
///
/// The store itself has no failure modes beyond its storage backend: a
/// missing token is `Ok(None)`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The durable storage could not be read or written.
    #[error("session storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    /// The durable storage exists but its contents don't parse.
    /// Deleting the session file resets the client to logged out.
    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

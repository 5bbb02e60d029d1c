//! The session store: the bearer token and its cached user.
//!
//! # Concurrency note
//!
//! The store is shared (`Arc<SessionStore>`) between the auth state
//! machine and every in-flight request. All access goes through one
//! `std::sync::Mutex`, so a reader always sees a whole write, never half
//! of one. The lock is never held across an `.await`: storage calls are
//! synchronous.

use std::sync::{Mutex, MutexGuard, PoisonError};

use fleetgate_protocol::{Token, User};

use crate::{MemoryStorage, SessionError, Storage};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Storage key holding the JSON of the user the token belongs to.
pub const USER_KEY: &str = "user";

/// Holds the current bearer token on top of a durable [`Storage`].
///
/// Invariants maintained here:
/// - after [`clear`](Self::clear), [`get`](Self::get) returns `None`
/// - the cached user never outlives the token it was loaded for: `set`
///   and `clear` both drop it
pub struct SessionStore {
    storage: Mutex<Box<dyn Storage>>,
}

impl SessionStore {
    /// Creates a store over the given storage backend.
    pub fn new(storage: impl Storage) -> Self {
        Self {
            storage: Mutex::new(Box::new(storage)),
        }
    }

    /// Creates a store over an already boxed backend.
    pub fn from_boxed(storage: Box<dyn Storage>) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }

    /// Creates a store that forgets everything when the process exits.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    // A panic while holding the lock can't leave a half-written entry
    // behind (each storage call is a single insert/remove), so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Box<dyn Storage>> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the stored token, if any. An empty stored value counts as
    /// no token.
    pub fn get(&self) -> Result<Option<Token>, SessionError> {
        let value = self.lock().get_item(TOKEN_KEY)?;
        Ok(value.filter(|v| !v.is_empty()).map(Token::new))
    }

    /// Stores a new token, replacing any previous one and dropping the
    /// previous token's cached user.
    pub fn set(&self, token: &Token) -> Result<(), SessionError> {
        let mut storage = self.lock();
        storage.remove_item(USER_KEY)?;
        storage.set_item(TOKEN_KEY, token.as_str())?;
        tracing::debug!("session token stored");
        Ok(())
    }

    /// Removes the token and the cached user. A no-op when already empty.
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut storage = self.lock();
        storage.remove_item(TOKEN_KEY)?;
        storage.remove_item(USER_KEY)?;
        tracing::debug!("session cleared");
        Ok(())
    }

    /// Clears the session only if it still holds `token`.
    ///
    /// Returns `true` if this call removed the token. When several
    /// requests made with the same token are rejected at once, exactly one
    /// caller sees `true`. A rejection for an older token leaves a newer
    /// session alone.
    pub fn clear_if(&self, token: &Token) -> Result<bool, SessionError> {
        let mut storage = self.lock();
        let current = storage.get_item(TOKEN_KEY)?;
        if current.as_deref() != Some(token.as_str()) {
            return Ok(false);
        }
        storage.remove_item(TOKEN_KEY)?;
        storage.remove_item(USER_KEY)?;
        tracing::debug!("session cleared after rejection");
        Ok(true)
    }

    /// Returns the cached user for the current token.
    ///
    /// The cache is best effort: an entry that no longer parses (e.g.
    /// written by an older client) is reported as absent.
    pub fn user(&self) -> Result<Option<User>, SessionError> {
        let mut storage = self.lock();
        if storage.get_item(TOKEN_KEY)?.is_none() {
            return Ok(None);
        }
        let Some(raw) = storage.get_item(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable cached user");
                Ok(None)
            }
        }
    }

    /// Caches `user` as the identity of `token`.
    ///
    /// Does nothing and returns `false` if `token` is no longer the stored
    /// token (a logout or forced logout won the race).
    pub fn cache_user(
        &self,
        token: &Token,
        user: &User,
    ) -> Result<bool, SessionError> {
        let raw = serde_json::to_string(user)?;
        let mut storage = self.lock();
        if storage.get_item(TOKEN_KEY)?.as_deref() != Some(token.as_str()) {
            return Ok(false);
        }
        storage.set_item(USER_KEY, &raw)?;
        Ok(true)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

//! The session-invalidated signal.
//!
//! When the backend rejects an authenticated call, the pipeline does not
//! navigate anywhere itself. It emits a [`SessionEvent`] and whoever owns
//! the application (a UI shell, a CLI, a test) decides what "go to the
//! login screen" means.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Events the pipeline publishes about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The stored session was rejected by the backend and has been
    /// cleared. The application should leave whatever it is showing and
    /// go to `login_path`.
    Invalidated { login_path: String },
}

/// Broadcasts [`SessionEvent`]s to any number of observers.
///
/// Cloning is cheap and every clone publishes to the same subscribers.
/// Observers that subscribe late miss earlier events; the session store is
/// the source of truth for "is there a session right now".
#[derive(Debug, Clone)]
pub struct SessionSignal {
    tx: broadcast::Sender<SessionEvent>,
    login_path: Arc<str>,
    emitted: Arc<AtomicU64>,
}

impl SessionSignal {
    /// Creates a signal whose invalidation events point at `login_path`.
    pub fn new(login_path: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            login_path: Arc::from(login_path.into()),
            emitted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// The login entry point carried by invalidation events.
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// How many invalidation events have been emitted in total.
    pub fn invalidations(&self) -> u64 {
        self.emitted.load(Ordering::Acquire)
    }

    pub(crate) fn invalidate(&self) {
        self.emitted.fetch_add(1, Ordering::AcqRel);
        let event = SessionEvent::Invalidated {
            login_path: self.login_path.to_string(),
        };
        // No subscribers is fine: nobody is around to navigate.
        let observers = self.tx.send(event).unwrap_or(0);
        tracing::info!(
            observers,
            login_path = %self.login_path,
            "session invalidated, login required"
        );
    }
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new("/login")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_reaches_every_subscriber() {
        let signal = SessionSignal::new("/login");
        let mut a = signal.subscribe();
        let mut b = signal.clone().subscribe();

        signal.invalidate();

        let expected = SessionEvent::Invalidated {
            login_path: "/login".into(),
        };
        assert_eq!(a.try_recv().unwrap(), expected);
        assert_eq!(b.try_recv().unwrap(), expected);
        assert_eq!(signal.invalidations(), 1);
    }

    #[test]
    fn test_invalidate_without_subscribers_still_counts() {
        let signal = SessionSignal::default();
        signal.invalidate();
        assert_eq!(signal.invalidations(), 1);
        assert_eq!(signal.login_path(), "/login");
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let signal = SessionSignal::default();
        signal.invalidate();

        let mut late = signal.subscribe();

        assert!(late.try_recv().is_err());
    }
}

//! `FleetClient` builder and lifecycle.
//!
//! This is the entry point for an application. It ties the layers
//! together (transport → pipeline → auth service → state machine) and
//! owns the background task that turns pipeline session events into state
//! changes.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;

use fleetgate_pipeline::{ApiClient, SessionEvent, SessionSignal};
use fleetgate_session::{FileStorage, SessionStore, Storage};
use fleetgate_transport::{HttpTransport, ReqwestTransport};

use crate::{
    AuthManager, AuthService, AuthState, ClientConfig, FleetError, Resources,
};

/// Builder for a [`FleetClient`].
///
/// # Example
///
/// ```rust,no_run
/// use fleetgate::prelude::*;
///
/// # async fn run() -> Result<(), FleetError> {
/// let client = FleetClient::builder()
///     .config(ClientConfig::from_env()?)
///     .build()?;
/// client.start().await;
/// # Ok(())
/// # }
/// ```
pub struct FleetClientBuilder {
    config: ClientConfig,
    storage: Option<Box<dyn Storage>>,
}

impl FleetClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            storage: None,
        }
    }

    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `storage` for the session instead of the one implied by
    /// [`ClientConfig::session_file`].
    pub fn storage(mut self, storage: impl Storage) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    /// Builds a client talking HTTP to [`ClientConfig::base_url`].
    pub fn build(self) -> Result<FleetClient<ReqwestTransport>, FleetError> {
        let transport = ReqwestTransport::with_timeout(
            &self.config.base_url,
            self.config.request_timeout,
        )?;
        self.build_with(Arc::new(transport))
    }

    /// Builds a client over a caller-supplied transport.
    pub fn build_with<T: HttpTransport>(
        self,
        transport: Arc<T>,
    ) -> Result<FleetClient<T>, FleetError> {
        let store = match (self.storage, &self.config.session_file) {
            (Some(storage), _) => SessionStore::from_boxed(storage),
            (None, Some(path)) => SessionStore::new(FileStorage::open(path)?),
            (None, None) => SessionStore::in_memory(),
        };
        let store = Arc::new(store);
        let signal = SessionSignal::new(self.config.login_path.clone());
        let api = Arc::new(ApiClient::new(transport, Arc::clone(&store), signal));
        let auth = Arc::new(AuthManager::new(
            AuthService::new(Arc::clone(&api)),
            store,
        ));
        let resources = Resources::new(Arc::clone(&api));

        tracing::debug!(
            base_url = %self.config.base_url,
            persistent = self.config.session_file.is_some(),
            "fleet client built"
        );
        Ok(FleetClient {
            config: self.config,
            api,
            auth,
            resources,
            watcher: Mutex::new(None),
        })
    }
}

impl Default for FleetClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One per process: the session, the auth state and the API behind them.
///
/// Create it with [`FleetClient::builder`], call [`start`](Self::start)
/// once, and pass it by reference to whatever needs it. Dropping the
/// client stops its background task.
pub struct FleetClient<T> {
    config: ClientConfig,
    api: Arc<ApiClient<T>>,
    auth: Arc<AuthManager<T>>,
    resources: Resources<T>,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl FleetClient<ReqwestTransport> {
    pub fn builder() -> FleetClientBuilder {
        FleetClientBuilder::new()
    }
}

impl<T: HttpTransport> FleetClient<T> {
    /// Starts watching for forced logouts, then restores the stored
    /// session. Returns the settled state.
    ///
    /// Calling it again re-validates the session; the watcher is only
    /// started once.
    pub async fn start(&self) -> AuthState {
        {
            let mut watcher =
                self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
            if watcher.is_none() {
                *watcher = Some(spawn_watcher(
                    Arc::clone(&self.auth),
                    self.api.signal().subscribe(),
                ));
            }
        }
        let state = self.auth.initialize().await;
        tracing::info!(%state, "fleet client started");
        state
    }

    /// Stops the background watcher and waits for it to finish.
    pub async fn shutdown(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.stop().await;
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The auth state machine.
    pub fn auth(&self) -> &AuthManager<T> {
        &self.auth
    }

    /// Shortcut for `auth().subscribe()`.
    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.auth.subscribe()
    }

    /// Bus and route calls.
    pub fn resources(&self) -> &Resources<T> {
        &self.resources
    }

    /// The shared API client, for calls not covered by [`resources`](Self::resources).
    pub fn api(&self) -> &Arc<ApiClient<T>> {
        &self.api
    }

    /// Subscribes to session events. The application reacts to
    /// [`SessionEvent::Invalidated`] by showing its login screen.
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.api.signal().subscribe()
    }
}

impl<T> Drop for FleetClient<T> {
    fn drop(&mut self) {
        let watcher = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.task.abort();
        }
    }
}

impl<T> std::fmt::Debug for FleetClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetClient")
            .field("config", &self.config)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Invalidation watcher
// ---------------------------------------------------------------------------

struct WatcherHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "session watcher ended abnormally");
        }
    }
}

fn spawn_watcher<T: HttpTransport>(
    auth: Arc<AuthManager<T>>,
    events: broadcast::Receiver<SessionEvent>,
) -> WatcherHandle {
    let (stop_tx, stopped) = oneshot::channel();
    let task = tokio::spawn(watch_sessions(auth, events, stopped));
    WatcherHandle { stop_tx, task }
}

async fn watch_sessions<T: HttpTransport>(
    auth: Arc<AuthManager<T>>,
    mut events: broadcast::Receiver<SessionEvent>,
    mut stopped: oneshot::Receiver<()>,
) {
    tracing::debug!("session watcher started");
    loop {
        tokio::select! {
            _ = &mut stopped => break,
            event = events.recv() => match event {
                Ok(event) => auth.on_session_event(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "session watcher fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    tracing::debug!("session watcher stopped");
}

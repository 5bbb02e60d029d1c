//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::FleetError;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_API_URL: &str = "FLEETGATE_API_URL";
/// Environment variable overriding [`ClientConfig::login_path`].
pub const ENV_LOGIN_PATH: &str = "FLEETGATE_LOGIN_PATH";
/// Environment variable setting [`ClientConfig::session_file`].
pub const ENV_SESSION_FILE: &str = "FLEETGATE_SESSION_FILE";
/// Environment variable setting [`ClientConfig::request_timeout`], in
/// whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "FLEETGATE_TIMEOUT_SECS";

/// Configuration for a [`FleetClient`](crate::FleetClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin of the backend API. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Where the application should send the user when the session is
    /// invalidated. Carried in [`SessionEvent::Invalidated`].
    ///
    /// [`SessionEvent::Invalidated`]: fleetgate_pipeline::SessionEvent::Invalidated
    pub login_path: String,

    /// File holding the session between runs. `None` keeps the session in
    /// memory only.
    pub session_file: Option<PathBuf>,

    /// Per-request timeout. `None` waits for as long as the backend takes.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            login_path: "/login".to_string(),
            session_file: None,
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Starts from the defaults and applies any `FLEETGATE_*` variables
    /// set in the process environment.
    pub fn from_env() -> Result<Self, FleetError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`. Empty values are ignored.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, FleetError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var(ENV_API_URL) {
            config.base_url = url;
        }
        if let Some(path) = var(ENV_LOGIN_PATH) {
            config.login_path = path;
        }
        if let Some(file) = var(ENV_SESSION_FILE) {
            config.session_file = Some(PathBuf::from(file));
        }
        if let Some(secs) = var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                FleetError::Config(format!(
                    "{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {secs:?}"
                ))
            })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_default_points_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.login_path, "/login");
        assert!(config.session_file.is_none());
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_from_lookup_no_vars_is_default() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://fleet.example.com/api"),
            (ENV_LOGIN_PATH, "/signin"),
            (ENV_SESSION_FILE, "/tmp/fleet-session.json"),
            (ENV_TIMEOUT_SECS, "15"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://fleet.example.com/api");
        assert_eq!(config.login_path, "/signin");
        assert_eq!(
            config.session_file,
            Some(PathBuf::from("/tmp/fleet-session.json"))
        );
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_lookup_blank_values_are_ignored() {
        let config =
            ClientConfig::from_lookup(lookup(&[(ENV_API_URL, "  ")])).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_from_lookup_bad_timeout_is_config_error() {
        let result =
            ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")]));
        assert!(matches!(result, Err(FleetError::Config(_))));
    }

    #[test]
    fn test_builder_methods_override_defaults() {
        let config = ClientConfig::default()
            .with_base_url("http://10.0.0.2:8000")
            .with_login_path("/auth/login")
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.login_path, "/auth/login");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
    }
}

//! Client runtime configuration.
//!
//! Resolved once at process startup and handed to [`crate::DfsClient`]; operations never read
//! the environment themselves.

use crate::{ClientError, ClientResult};
use api_shared::constants::{
    DEFAULT_CLIENT_MOUNT_DIR, DEFAULT_DEADLINE_TIMEOUT, DEFAULT_SERVER_URI,
};
use api_shared::FileName;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the server URI.
pub const SERVER_URI_ENV: &str = "DFS_SERVER_URI";
/// Environment variable holding the client mount directory.
pub const CLIENT_MOUNT_ENV: &str = "DFS_CLIENT_MOUNT";
/// Environment variable holding the per-call timeout in milliseconds.
pub const DEADLINE_TIMEOUT_ENV: &str = "DFS_DEADLINE_TIMEOUT_MS";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    server_uri: String,
    mount_root: PathBuf,
    deadline_timeout: Duration,
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the server URI is blank or the timeout is zero.
    pub fn new(
        server_uri: impl Into<String>,
        mount_root: impl Into<PathBuf>,
        deadline_timeout: Duration,
    ) -> ClientResult<Self> {
        let server_uri = server_uri.into();
        if server_uri.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "server_uri cannot be empty".into(),
            ));
        }
        if deadline_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "deadline timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            server_uri,
            mount_root: mount_root.into(),
            deadline_timeout,
        })
    }

    /// Build a configuration from `DFS_SERVER_URI`, `DFS_CLIENT_MOUNT` and
    /// `DFS_DEADLINE_TIMEOUT_MS`, falling back to the shared defaults.
    pub fn from_env() -> ClientResult<Self> {
        Self::resolve(None, None, None)
    }

    /// Build a configuration from explicit values, reading the environment (and then the shared
    /// defaults) only for the values that are `None`.
    pub fn resolve(
        server_uri: Option<String>,
        mount_root: Option<PathBuf>,
        deadline_timeout: Option<Duration>,
    ) -> ClientResult<Self> {
        let server_uri = server_uri.unwrap_or_else(|| {
            std::env::var(SERVER_URI_ENV).unwrap_or_else(|_| DEFAULT_SERVER_URI.into())
        });
        let mount_root = mount_root.unwrap_or_else(|| {
            std::env::var(CLIENT_MOUNT_ENV)
                .unwrap_or_else(|_| DEFAULT_CLIENT_MOUNT_DIR.into())
                .into()
        });
        let deadline_timeout = match deadline_timeout {
            Some(timeout) => timeout,
            None => deadline_timeout_from_env_value(std::env::var(DEADLINE_TIMEOUT_ENV).ok())?,
        };

        Self::new(server_uri, mount_root, deadline_timeout)
    }

    pub fn server_uri(&self) -> &str {
        &self.server_uri
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    pub fn deadline_timeout(&self) -> Duration {
        self.deadline_timeout
    }

    /// Local location of a logical filename.
    pub fn local_path(&self, name: &FileName) -> PathBuf {
        self.mount_root.join(name)
    }
}

/// Parse the per-call timeout from an optional millisecond string.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DEADLINE_TIMEOUT`].
pub fn deadline_timeout_from_env_value(value: Option<String>) -> ClientResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_DEADLINE_TIMEOUT),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ClientError::InvalidConfig(format!("{DEADLINE_TIMEOUT_ENV}={v}: {e}"))),
    }
}

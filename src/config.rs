// ============================================================================
// File: packages/rerobots/src/config.rs
// ----------------------------------------------------------------------------
// Configuration types for the API client and instance controller
// ============================================================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::RerobotsResult;
use crate::ssh::SshAuth;

/// Default API endpoint
pub const DEFAULT_BASE_URI: &str = "https://api.rerobots.net";

/// Environment variable holding a raw bearer token
pub const TOKEN_ENV_VAR: &str = "REROBOTS_API_TOKEN";

/// Environment variable overriding the API endpoint
pub const BASE_URI_ENV_VAR: &str = "REROBOTS_API_URL";

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix for every API request path
    pub base_uri: String,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Bearer token; `None` means anonymous requests
    pub api_token: Option<String>,
}

impl ClientConfig {
    /// Create a configuration for the default endpoint with no token
    pub fn new() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            request_timeout: Duration::from_secs(30),
            api_token: None,
        }
    }

    /// Build configuration from `REROBOTS_API_TOKEN` and `REROBOTS_API_URL`
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(uri) = std::env::var(BASE_URI_ENV_VAR)
            && !uri.trim().is_empty()
        {
            config.base_uri = uri.trim().to_string();
        }
        config.api_token = token_from_env();
        config
    }

    /// Set the API endpoint
    pub fn with_base_uri<U: Into<String>>(mut self, base_uri: U) -> Self {
        self.base_uri = base_uri.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the bearer token
    pub fn with_token<T: Into<String>>(mut self, token: T) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Instance controller configuration
///
/// Polling and connection parameters are carried per instance so that two
/// controllers in one process never share hidden timing state.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Delay between status polls in `wait_for_ready`
    pub poll_interval: Duration,

    /// Upper bound for `wait_for_ready`
    pub ready_timeout: Duration,

    /// TCP connect and SSH I/O timeout
    pub ssh_connect_timeout: Duration,

    /// Remote login name
    pub ssh_username: String,

    /// Overrides the key issued at lease creation
    pub ssh_auth: Option<SshAuth>,
}

impl InstanceConfig {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            ready_timeout: Duration::from_secs(180),
            ssh_connect_timeout: Duration::from_secs(5),
            ssh_username: "root".to_string(),
            ssh_auth: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_ssh_connect_timeout(mut self, timeout: Duration) -> Self {
        self.ssh_connect_timeout = timeout;
        self
    }

    pub fn with_ssh_username<U: Into<String>>(mut self, username: U) -> Self {
        self.ssh_username = username.into();
        self
    }

    pub fn with_ssh_auth(mut self, auth: SshAuth) -> Self {
        self.ssh_auth = Some(auth);
        self
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn token_from_env() -> Option<String> {
    std::env::var(TOKEN_ENV_VAR)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Read a plaintext token file, trimming surrounding whitespace
pub fn read_token_file(path: &Path) -> RerobotsResult<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Resolve the API token: token file first, then `REROBOTS_API_TOKEN`
pub fn resolve_token(token_file: Option<&Path>) -> RerobotsResult<Option<String>> {
    match token_file {
        Some(path) => read_token_file(path).map(Some),
        None => Ok(token_from_env()),
    }
}

//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! Identity provider credentials are not part of it: they are discovered
//! separately by [`ResolverChain`](gatekeeper_identity::ResolverChain),
//! starting with the file named by `local_config`.

use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (`PORT`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served to everyone.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Directory served under `/protected` to logged-in users only.
    #[serde(default = "default_protected_dir")]
    pub protected_dir: PathBuf,

    /// Where successful logins land.
    #[serde(default = "default_landing_page")]
    pub landing_page: String,

    /// Local identity provider credential file, tried first.
    #[serde(default = "default_local_config")]
    pub local_config: PathBuf,

    /// Upper bound on each call to the identity provider, in seconds.
    #[serde(default = "default_broker_timeout_seconds")]
    pub broker_timeout_seconds: u64,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which the session store forgets a session.
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_minutes: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to false for local HTTP development.
    #[serde(default)]
    pub secure_cookies: bool,

    /// Whether the guard may use the refresh-token cookie to log a
    /// session back in instead of sending it to the login page.
    #[serde(default)]
    pub silent_refresh: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_protected_dir() -> PathBuf {
    PathBuf::from("protected")
}

fn default_landing_page() -> String {
    "/protected/protected.html".to_string()
}

fn default_local_config() -> PathBuf {
    PathBuf::from(gatekeeper_identity::DEFAULT_LOCAL_CONFIG)
}

fn default_broker_timeout_seconds() -> u64 {
    10
}

fn default_inactivity_minutes() -> i64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_minutes: default_inactivity_minutes(),
            secure_cookies: false,
            silent_refresh: false,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    /// Loads configuration from an explicit environment source.
    fn from_source(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the socket address string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

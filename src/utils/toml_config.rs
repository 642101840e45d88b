//! TOML-based configuration for the Voxa dashboard
//!
//! This module provides declarative configuration for the API endpoint,
//! session storage, the access guard and the metrics feeds via a TOML file
//! (`voxa.toml`). Every section is optional and falls back to defaults.
//!
//! Use [`ConfigManager`] for thread-safe access to the current configuration.

use crate::metrics::aggregator::AggregatorConfig;
use crate::metrics::reconnect::ReconnectPolicy;
use crate::metrics::types::FeedKind;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Root configuration structure loaded from voxa.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoxaConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= API Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============= Session Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token storage file; a leading `~/` expands to `$HOME`
    #[serde(default = "default_session_path")]
    pub path: String,

    /// Key under which the token is stored
    #[serde(default = "default_session_key")]
    pub key: String,
}

fn default_session_path() -> String {
    "~/.voxa/session.json".to_string()
}

fn default_session_key() -> String {
    crate::auth::session::DEFAULT_TOKEN_KEY.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            key: default_session_key(),
        }
    }
}

impl SessionConfig {
    /// Storage path with `~/` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        match (self.path.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => PathBuf::from(&self.path),
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Where unauthenticated users are sent
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Environment variable containing the JWT secret. When set and present,
    /// stored tokens must be valid signed JWTs.
    #[serde(default)]
    pub jwt_secret_env: Option<String>,
}

fn default_login_path() -> String {
    crate::auth::guard::DEFAULT_LOGIN_PATH.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            jwt_secret_env: None,
        }
    }
}

// ============= Metrics Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Feeds the dashboard requires
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedKind>,

    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,

    #[serde(default = "default_true")]
    pub reconnect_jitter: bool,
}

fn default_feeds() -> Vec<FeedKind> {
    FeedKind::ALL.to_vec()
}

fn default_reconnect_initial_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_reconnect_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            reconnect_multiplier: default_reconnect_multiplier(),
            reconnect_jitter: default_true(),
        }
    }
}

impl MetricsConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect_initial_ms),
            max_delay: Duration::from_millis(self.reconnect_max_ms),
            multiplier: self.reconnect_multiplier,
            jitter: self.reconnect_jitter,
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig::default()
            .with_feeds(self.feeds.clone())
            .with_reconnect(self.reconnect_policy())
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(e: ConfigError) -> Self {
        crate::types::AppError::Config(e.to_string())
    }
}

impl VoxaConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the file if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(path)) => {
                info!("No configuration at {:?}, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: VoxaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "api.base_url '{}' is not a valid URL: {}",
                self.api.base_url, e
            ))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.session.key.is_empty() {
            return Err(ConfigError::ValidationError(
                "session.key must not be empty".to_string(),
            ));
        }

        if !self.auth.login_path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "auth.login_path must be an absolute path, got '{}'",
                self.auth.login_path
            )));
        }

        if self.metrics.feeds.is_empty() {
            return Err(ConfigError::ValidationError(
                "metrics.feeds must name at least one feed".to_string(),
            ));
        }

        if self.metrics.reconnect_initial_ms == 0
            || self.metrics.reconnect_max_ms < self.metrics.reconnect_initial_ms
        {
            return Err(ConfigError::ValidationError(
                "metrics.reconnect_initial_ms must be positive and not exceed reconnect_max_ms"
                    .to_string(),
            ));
        }

        if self.metrics.reconnect_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "metrics.reconnect_multiplier must be at least 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the JWT secret from the environment, if JWT validation is configured
    pub fn jwt_secret(&self) -> Result<Option<String>, ConfigError> {
        match &self.auth.jwt_secret_env {
            Some(env) => std::env::var(env)
                .map(Some)
                .map_err(|_| ConfigError::MissingEnvVar(env.clone())),
            None => Ok(None),
        }
    }
}

// ============= Configuration Manager =============

/// Thread-safe configuration manager with lock-free reads
pub struct ConfigManager {
    config: Arc<ArcSwap<VoxaConfig>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = VoxaConfig::load_or_default(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    pub fn from_config(config: VoxaConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("voxa.toml"),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<VoxaConfig> {
        self.config.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reload the configuration from disk. On failure the previous
    /// configuration stays active.
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = VoxaConfig::load_or_default(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }
}

impl Clone for ConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
        }
    }
}

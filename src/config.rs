//! Configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/telemetry_dash.toml` (or an explicit path)
//! 2. Environment variables prefixed with `TELEMETRY_DASH_`, nested keys
//!    separated by `__` (e.g. `TELEMETRY_DASH_WINDOW__CAPACITY=50`)
//!
//! Every field has a default, so a missing file yields a usable configuration.
//!
//! # Example
//! ```no_run
//! use telemetry_dash::config::DashConfig;
//!
//! let config = DashConfig::load()?;
//! config.validate()?;
//! println!("Endpoint: {}", config.connection.endpoint);
//! # Ok::<(), telemetry_dash::error::DashError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{DashError, DashResult};
use crate::window::DEFAULT_WINDOW_CAPACITY;

/// Default configuration file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/telemetry_dash.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TELEMETRY_DASH_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Telemetry endpoint settings
    pub connection: ConnectionConfig,
    /// Reconnect backoff settings
    pub retry: RetryConfig,
    /// Chart window settings
    pub window: WindowConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Window title / application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "Telemetry Dashboard".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored (development)
    #[default]
    Pretty,
    /// Single-line, no colors
    Compact,
    /// Structured JSON lines
    Json,
}

/// Streaming endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket URL of the telemetry feed
    pub endpoint: String,
    /// Upper bound on one handshake
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Upper bound on closing the transport during stop
    #[serde(with = "humantime_serde")]
    pub close_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8000/ws".to_string(),
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(1),
        }
    }
}

/// Reconnect strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Constant delay between attempts
    #[default]
    Fixed,
    /// Doubling delay, capped at `max_delay`
    Exponential,
}

/// Reconnect backoff configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Backoff strategy
    pub strategy: RetryStrategy,
    /// Delay before the first retry (and every retry for `fixed`)
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Ceiling for `exponential`
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Fixed,
            delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Chart window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Number of points kept per series
    pub capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl DashConfig {
    /// Load configuration from the default path and environment variables.
    pub fn load() -> DashResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path and environment variables.
    pub fn load_from<P: AsRef<Path>>(path: P) -> DashResult<Self> {
        let config = Figment::from(Serialized::defaults(DashConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Render the configuration as TOML, in the same layout the loader reads.
    pub fn to_toml(&self) -> DashResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> DashResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.application.log_level.to_lowercase();
        if !valid_levels.contains(&level.as_str()) {
            return Err(DashError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let endpoint = url::Url::parse(&self.connection.endpoint).map_err(|e| {
            DashError::Configuration(format!(
                "Invalid endpoint '{}': {}",
                self.connection.endpoint, e
            ))
        })?;
        if endpoint.scheme() != "ws" {
            return Err(DashError::Configuration(format!(
                "Invalid endpoint scheme '{}'. Must be ws (TLS endpoints are not supported)",
                endpoint.scheme()
            )));
        }

        if self.connection.connect_timeout.is_zero() {
            return Err(DashError::Configuration(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }

        if self.retry.delay.is_zero() {
            return Err(DashError::Configuration(
                "retry delay must be greater than zero".to_string(),
            ));
        }
        if self.retry.strategy == RetryStrategy::Exponential
            && self.retry.max_delay < self.retry.delay
        {
            return Err(DashError::Configuration(format!(
                "retry max_delay ({:?}) is shorter than delay ({:?})",
                self.retry.max_delay, self.retry.delay
            )));
        }

        if self.window.capacity == 0 {
            return Err(DashError::Configuration(
                "window capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = DashConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.endpoint, "ws://localhost:8000/ws");
        assert_eq!(config.retry.delay, Duration::from_secs(5));
        assert_eq!(config.retry.strategy, RetryStrategy::Fixed);
        assert_eq!(config.window.capacity, 100);
    }

    #[test]
    #[serial]
    fn test_missing_file_yields_defaults() {
        let config = DashConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config, DashConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [application]
            log_level = "debug"
            log_format = "json"

            [connection]
            endpoint = "ws://10.0.0.5:9000/ws"
            connect_timeout = "3s"

            [retry]
            strategy = "exponential"
            delay = "500ms"
            max_delay = "30s"

            [window]
            capacity = 250
            "#
        )
        .unwrap();

        let config = DashConfig::load_from(file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.application.log_format, LogFormat::Json);
        assert_eq!(config.connection.endpoint, "ws://10.0.0.5:9000/ws");
        assert_eq!(config.connection.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.connection.close_timeout, Duration::from_secs(1));
        assert_eq!(config.retry.strategy, RetryStrategy::Exponential);
        assert_eq!(config.retry.delay, Duration::from_millis(500));
        assert_eq!(config.retry.max_delay, Duration::from_secs(30));
        assert_eq!(config.window.capacity, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("TELEMETRY_DASH_WINDOW__CAPACITY", "42");
        let config = DashConfig::load_from("does/not/exist.toml");
        std::env::remove_var("TELEMETRY_DASH_WINDOW__CAPACITY");
        assert_eq!(config.unwrap().window.capacity, 42);
    }

    #[test]
    #[serial]
    fn test_rendered_toml_loads_back() {
        let mut config = DashConfig::default();
        config.connection.endpoint = "ws://example.org/feed".to_string();
        config.retry.strategy = RetryStrategy::Exponential;
        config.retry.delay = Duration::from_millis(250);
        config.window.capacity = 30;

        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[retry]"));
        assert!(rendered.contains("delay = \"250ms\""));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();
        assert_eq!(DashConfig::load_from(file.path()).unwrap(), config);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = DashConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = DashConfig::default();
        config.connection.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());

        config.connection.endpoint = "http://localhost:8000/ws".to_string();
        assert!(config.validate().is_err());

        config.connection.endpoint = "ws://example.org:9000/feed".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_endpoint_rejected() {
        let mut config = DashConfig::default();
        config.connection.endpoint = "wss://127.0.0.1:8443/ws".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DashError::Configuration(_)));
        assert!(err.to_string().contains("'wss'"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = DashConfig::default();
        config.window.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_bounds() {
        let mut config = DashConfig::default();
        config.retry.delay = Duration::ZERO;
        assert!(config.validate().is_err());

        config.retry.delay = Duration::from_secs(10);
        config.retry.max_delay = Duration::from_secs(5);
        // max_delay only matters for exponential
        assert!(config.validate().is_ok());
        config.retry.strategy = RetryStrategy::Exponential;
        assert!(config.validate().is_err());
    }
}

//! Configuration management for redisdump
//!
//! Configuration comes from, highest precedence first:
//! 1. Command-line arguments
//! 2. Environment variables (`REDIS_URL`)
//! 3. Configuration file (TOML, `~/.redisdump/config.toml` by default)
//! 4. Default values
//!
//! A missing default config file is not an error; an explicitly named one is.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::export::{ExportOptions, OutputMode};

/// Placeholder in [`ExportConfig::file_name`] replaced by the current date
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection configuration
    pub connection: ConnectionConfig,

    /// Export configuration
    pub export: ExportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server URL (`redis://[user:password@]host[:port][/db]`)
    #[serde(default = "default_url")]
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Per-request timeout in seconds (0 waits forever)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Number of retry attempts on connection failure
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Glob pattern selecting the keys to export
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// `COUNT` hint per SCAN round-trip
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Directory receiving dump files; must exist
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Dump file name; `{date}` becomes `YYYY-MM-DD`
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Overwrite or append to an existing dump file
    #[serde(default)]
    pub mode: OutputMode,

    /// Emit `PEXPIRE` lines for keys with a time to live
    #[serde(default)]
    pub with_ttl: bool,

    /// Keep a resumable checkpoint in the data directory
    #[serde(default = "default_true")]
    pub checkpoint: bool,

    /// Show a progress spinner
    #[serde(default = "default_true")]
    pub progress: bool,

    /// Log a progress line every this many keys (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default)]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_pattern() -> String {
    "*".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_file_name() -> String {
    format!("dump ({DATE_PLACEHOLDER}).redis")
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    1000
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            batch_size: default_batch_size(),
            data_dir: default_data_dir(),
            file_name: default_file_name(),
            mode: OutputMode::default(),
            with_ttl: false,
            checkpoint: true,
            progress: true,
            progress_interval: default_progress_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: false,
        }
    }
}

impl Config {
    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".redisdump")
            .join("config.toml")
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Explicit config file, or `None` for the default location
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration, defaults when the default
    ///   file does not exist
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Serialize the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Generic(format!("Failed to serialize config: {e}")).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.connection.url.trim().is_empty() {
            return Err(invalid("connection.url", &self.connection.url));
        }
        if self.export.batch_size == 0 {
            return Err(invalid("export.batch_size", "0"));
        }
        let name = self.export.file_name.replace(DATE_PLACEHOLDER, "");
        if name.trim().is_empty() || name.contains('/') {
            return Err(invalid("export.file_name", &self.export.file_name));
        }
        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout)
    }

    /// Get request timeout as Duration, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.connection.request_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Default dump file path for a given date (`YYYY-MM-DD`)
    pub fn output_path(&self, date: &str) -> PathBuf {
        let name = self.export.file_name.replace(DATE_PLACEHOLDER, date);
        self.export.data_dir.join(name)
    }

    /// Settings for one export run
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            pattern: self.export.pattern.clone(),
            batch_size: self.export.batch_size,
            with_ttl: self.export.with_ttl,
            progress_interval: self.export.progress_interval,
        }
    }
}

fn invalid(field: &str, value: &str) -> crate::error::DumpError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DumpError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.url, "redis://127.0.0.1:6379");
        assert_eq!(config.export.batch_size, 1000);
        assert_eq!(config.export.mode, OutputMode::Overwrite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [export]
            pattern = "user:*"
            mode = "append"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.export.pattern, "user:*");
        assert_eq!(config.export.mode, OutputMode::Append);
        assert_eq!(config.export.batch_size, 1000);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.connection.retry_attempts, 3);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml_str("[export\nbatch_size = ").unwrap_err();
        assert!(matches!(err, DumpError::Config(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.export.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.file_name = DATE_PLACEHOLDER.to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_path_fills_date() {
        let config = Config::default();
        assert_eq!(
            config.output_path("2024-03-09"),
            PathBuf::from("./data").join("dump (2024-03-09).redis")
        );
    }

    #[test]
    fn test_request_timeout_zero_disables() {
        let mut config = Config::default();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        config.connection.request_timeout = 0;
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = Config::load_from_file(Some(Path::new("/nonexistent/redisdump.toml"))).unwrap_err();
        assert!(matches!(err, DumpError::Config(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.export.file_name, config.export.file_name);
    }
}

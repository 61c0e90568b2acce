//! Configuration module for ShareMirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Every section is optional in the file; missing sections take their defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ShareMirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub poller: PollerConfig,
    pub provider: ProviderConfig,
    pub notifications: NotificationsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// When tasks are checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between global ticks over all tasks without their own interval.
    pub interval_secs: u64,
    /// Seconds between sweeps looking for tasks whose own interval elapsed.
    pub override_sweep_secs: u64,
    /// Seconds between recycle-bin purges; `None` disables purging.
    pub clear_recycle_interval_secs: Option<u64>,
}

/// Batch operation polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Status polls per batch operation before giving up.
    pub max_attempts: u32,
    /// Milliseconds to wait between polls.
    pub delay_ms: u64,
}

/// Storage provider endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Pause between consecutive rename requests, in milliseconds.
    pub rename_pause_ms: u64,
    /// Entries requested per folder listing page.
    pub page_size: usize,
}

/// Operator notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Send summaries to the webhook; when false they are only logged.
    pub enabled: bool,
    /// Chat webhook receiving `{"msgtype":"text"}` payloads.
    pub webhook_url: Option<String>,
    /// Robot signing secret; when set, requests carry `timestamp` and `sign`.
    pub secret: Option<String>,
}

/// Local state storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite database file.
    pub database: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/sharemirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("sharemirror")
            .join("config.yaml")
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default provider API base URL.
pub const DEFAULT_BASE_URL: &str = "https://cloud.189.cn/api";

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1800,
            override_sweep_secs: 60,
            clear_recycle_interval_secs: None,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 200,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            rename_pause_ms: 50,
            page_size: 1000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("sharemirror")
                .join("sharemirror.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"scheduler.interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Upper bound for `poller.max_attempts`.
const MAX_POLL_ATTEMPTS: u32 = 100;

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

fn http_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError {
            field: field.into(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError {
            field: field.into(),
            message: format!("invalid URL '{value}': {e}"),
        }),
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- scheduler ---
        positive(&mut errors, "scheduler.interval_secs", self.scheduler.interval_secs);
        positive(
            &mut errors,
            "scheduler.override_sweep_secs",
            self.scheduler.override_sweep_secs,
        );
        if let Some(secs) = self.scheduler.clear_recycle_interval_secs {
            positive(&mut errors, "scheduler.clear_recycle_interval_secs", secs);
        }

        // --- poller ---
        if self.poller.max_attempts == 0 || self.poller.max_attempts > MAX_POLL_ATTEMPTS {
            errors.push(ValidationError {
                field: "poller.max_attempts".into(),
                message: format!("must be in range 1..={MAX_POLL_ATTEMPTS}"),
            });
        }

        // --- provider ---
        http_url(&mut errors, "provider.base_url", &self.provider.base_url);
        positive(
            &mut errors,
            "provider.request_timeout_secs",
            self.provider.request_timeout_secs,
        );
        positive(&mut errors, "provider.page_size", self.provider.page_size as u64);

        // --- notifications ---
        match (&self.notifications.webhook_url, self.notifications.enabled) {
            (Some(url), _) => http_url(&mut errors, "notifications.webhook_url", url),
            (None, true) => errors.push(ValidationError {
                field: "notifications.webhook_url".into(),
                message: "required when notifications are enabled".into(),
            }),
            (None, false) => {}
        }
        if self.notifications.secret.as_deref().is_some_and(str::is_empty) {
            errors.push(ValidationError {
                field: "notifications.secret".into(),
                message: "must not be empty when set".into(),
            });
        }

        // --- storage ---
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use sharemirror_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .scheduler_interval_secs(600)
///     .poller_max_attempts(8)
///     .logging_level("debug")
///     .build();
/// assert_eq!(config.poller.max_attempts, 8);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- scheduler ---

    pub fn scheduler_interval_secs(mut self, seconds: u64) -> Self {
        self.config.scheduler.interval_secs = seconds;
        self
    }

    pub fn scheduler_override_sweep_secs(mut self, seconds: u64) -> Self {
        self.config.scheduler.override_sweep_secs = seconds;
        self
    }

    pub fn scheduler_clear_recycle_interval_secs(mut self, seconds: u64) -> Self {
        self.config.scheduler.clear_recycle_interval_secs = Some(seconds);
        self
    }

    // --- poller ---

    pub fn poller_max_attempts(mut self, attempts: u32) -> Self {
        self.config.poller.max_attempts = attempts;
        self
    }

    pub fn poller_delay_ms(mut self, ms: u64) -> Self {
        self.config.poller.delay_ms = ms;
        self
    }

    // --- provider ---

    pub fn provider_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.provider.base_url = url.into();
        self
    }

    pub fn provider_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.provider.request_timeout_secs = seconds;
        self
    }

    pub fn provider_rename_pause_ms(mut self, ms: u64) -> Self {
        self.config.provider.rename_pause_ms = ms;
        self
    }

    pub fn provider_page_size(mut self, size: usize) -> Self {
        self.config.provider.page_size = size;
        self
    }

    // --- notifications ---

    pub fn notifications_webhook(mut self, url: impl Into<String>) -> Self {
        self.config.notifications.enabled = true;
        self.config.notifications.webhook_url = Some(url.into());
        self
    }

    pub fn notifications_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.notifications.secret = Some(secret.into());
        self
    }

    // --- storage ---

    pub fn storage_database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

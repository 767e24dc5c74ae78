//! Runtime configuration.
//!
//! Read from `REELWATCH_*` environment variables through the `config` crate,
//! deserialized into [`AppConfig`] and validated before any I/O happens.

use reelwatch_core::errors::{ExError, ExErrorKind, Result};
use reelwatch_core::retention::RetentionPolicy;
use reelwatch_core_types::Sensitive;
use reelwatch_store::keys::{DEFAULT_DIFFS_PREFIX, DEFAULT_SNAPSHOTS_PREFIX};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "REELWATCH";

pub const DEFAULT_FEED_BASE_URL: &str = "https://www.ucicinemas.it/rest/v3/cinemas";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

fn default_feed_base_url() -> String {
    DEFAULT_FEED_BASE_URL.to_string()
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".reelwatch")
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_notify_concurrency() -> usize {
    4
}

fn default_snapshots_prefix() -> String {
    DEFAULT_SNAPSHOTS_PREFIX.to_string()
}

fn default_diffs_prefix() -> String {
    DEFAULT_DIFFS_PREFIX.to_string()
}

/// Service configuration
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Cinema whose programming is tracked
    pub cinema_id: String,

    /// Bearer token for the programming feed
    pub feed_token: Sensitive<String>,

    /// Bucket holding snapshots and diffs
    pub bucket: String,

    pub telegram_token: Sensitive<String>,
    pub telegram_chat_id: String,

    /// Artifacts older than this are purged
    pub retention_hours: u64,

    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,

    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,

    /// Directory containing the bucket directories
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,

    /// Upper bound on in-flight notifications
    #[serde(default = "default_notify_concurrency")]
    pub notify_concurrency: usize,

    #[serde(default = "default_snapshots_prefix")]
    pub snapshots_prefix: String,

    #[serde(default = "default_diffs_prefix")]
    pub diffs_prefix: String,
}

impl AppConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// `Config` if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load from an explicit variable map (keys as in the environment).
    ///
    /// # Errors
    ///
    /// `Config` if a required variable is missing or a value is invalid.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                // Values stay strings until deserialized; numeric fields are
                // converted by `config`, so ids and tokens keep leading zeros.
                config::Environment::with_prefix(ENV_PREFIX).source(vars),
            )
            .build()
            .map_err(config_error)?;

        let cfg: AppConfig = settings.try_deserialize().map_err(config_error)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// `Config` describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        require_segment("CINEMA_ID", &self.cinema_id)?;
        require_segment("BUCKET", &self.bucket)?;
        require_segment("SNAPSHOTS_PREFIX", &self.snapshots_prefix)?;
        require_segment("DIFFS_PREFIX", &self.diffs_prefix)?;
        require_non_empty("FEED_TOKEN", self.feed_token.expose())?;
        require_non_empty("TELEGRAM_TOKEN", self.telegram_token.expose())?;
        require_non_empty("TELEGRAM_CHAT_ID", &self.telegram_chat_id)?;
        require_http_url("FEED_BASE_URL", &self.feed_base_url)?;
        require_http_url("TELEGRAM_API_BASE", &self.telegram_api_base)?;

        if self.snapshots_prefix == self.diffs_prefix {
            return Err(invalid(
                "DIFFS_PREFIX",
                "must differ from SNAPSHOTS_PREFIX".to_string(),
            ));
        }
        if self.retention_hours == 0 {
            return Err(invalid("RETENTION_HOURS", "must be greater than 0".to_string()));
        }
        for (name, value) in [
            ("HTTP_TIMEOUT_SECS", self.http_timeout_secs),
            ("STORE_TIMEOUT_SECS", self.store_timeout_secs),
            ("NOTIFY_CONCURRENCY", self.notify_concurrency as u64),
        ] {
            if value == 0 {
                return Err(invalid(name, "must be greater than 0".to_string()));
            }
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Directory of the filesystem bucket
    pub fn bucket_path(&self) -> PathBuf {
        self.store_root.join(&self.bucket)
    }

    /// # Errors
    ///
    /// `Config` if the window cannot be represented.
    pub fn retention_policy(&self) -> Result<RetentionPolicy> {
        RetentionPolicy::from_hours(self.retention_hours)
    }
}

fn config_error(err: config::ConfigError) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_message(err.to_string())
}

fn invalid(name: &str, reason: String) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("validate_config")
        .with_message(format!("{}_{} {}", ENV_PREFIX, name, reason))
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(name, "must not be empty".to_string()));
    }
    Ok(())
}

/// Non-empty and usable as a single path/URL segment
fn require_segment(name: &str, value: &str) -> Result<()> {
    require_non_empty(name, value)?;
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(invalid(name, format!("'{}' must be a single path segment", value)));
    }
    Ok(())
}

fn require_http_url(name: &str, value: &str) -> Result<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| invalid(name, format!("'{}' is not a URL: {}", value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(name, format!("'{}' must use http or https", value)));
    }
    Ok(())
}

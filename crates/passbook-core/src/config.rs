//! Configuration management for Passbook.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::AccountType;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest statement lookback window an adapter will probe, in months.
pub const MAX_LOOKBACK_MONTHS: u32 = 24;

/// Main application configuration.
///
/// This is loaded from `~/.config/passbook/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP transport settings
    pub http: HttpConfig,
    /// Statement enumeration settings
    pub statements: StatementsConfig,
    /// Document generation polling settings
    pub polling: PollingConfig,
    /// Where downloaded statements are written
    pub output: OutputConfig,
    /// Per-bank account type overrides: bank id -> raw code -> type
    pub account_types: HashMap<String, HashMap<String, AccountType>>,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if missing.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PASSBOOK_LOOKBACK_MONTHS`: Override statement lookback window
    /// - `PASSBOOK_POLL_INTERVAL_MS`: Override poll interval
    /// - `PASSBOOK_POLL_MAX_ATTEMPTS`: Override poll attempt bound
    /// - `PASSBOOK_HTTP_TIMEOUT_SECS`: Override request timeout
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `PASSBOOK_*` environment overrides in place.
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PASSBOOK_LOOKBACK_MONTHS") {
            if let Ok(months) = val.parse() {
                self.statements.lookback_months = months;
                tracing::debug!("Override statements.lookback_months from env: {}", months);
            }
        }

        if let Ok(val) = std::env::var("PASSBOOK_POLL_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.polling.interval_ms = interval;
                tracing::debug!("Override polling.interval_ms from env: {}", interval);
            }
        }

        if let Ok(val) = std::env::var("PASSBOOK_POLL_MAX_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                self.polling.max_attempts = attempts;
                tracing::debug!("Override polling.max_attempts from env: {}", attempts);
            }
        }

        if let Ok(val) = std::env::var("PASSBOOK_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.http.timeout_secs = secs;
                tracing::debug!("Override http.timeout_secs from env: {}", secs);
            }
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.statements.lookback_months == 0
            || self.statements.lookback_months > MAX_LOOKBACK_MONTHS
        {
            return Err(ConfigError::InvalidValue {
                field: "statements.lookback_months".to_string(),
                reason: format!("must be between 1 and {MAX_LOOKBACK_MONTHS}"),
            });
        }
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/passbook/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "passbook", "passbook").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Directory statements are written to.
    ///
    /// Uses `output.download_dir` when set, else `~/.local/share/passbook/statements`.
    pub fn download_dir(&self) -> ConfigResult<PathBuf> {
        if let Some(dir) = &self.output.download_dir {
            return Ok(dir.clone());
        }
        let dirs =
            ProjectDirs::from("com", "passbook", "passbook").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().join("statements"))
    }

    /// Runtime settings handed to adapters.
    #[must_use]
    pub fn adapter_settings(&self) -> AdapterSettings {
        AdapterSettings {
            lookback_months: self.statements.lookback_months,
            recent_years: self.statements.recent_years,
            poll_interval: Duration::from_millis(self.polling.interval_ms),
            poll_max_attempts: self.polling.max_attempts,
            account_types: self.account_types.clone(),
        }
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36".to_string(),
        }
    }
}

/// Statement enumeration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementsConfig {
    /// Months probed by adapters that enumerate per month
    pub lookback_months: u32,
    /// Years listed by adapters that enumerate per year
    pub recent_years: u32,
}

impl Default for StatementsConfig {
    fn default() -> Self {
        Self {
            lookback_months: 12,
            recent_years: 3,
        }
    }
}

/// Document generation polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status checks in milliseconds
    pub interval_ms: u64,
    /// Status checks before giving up
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 30,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory downloaded statements are written to
    pub download_dir: Option<PathBuf>,
}

/// Settings an adapter may consult during a call.
///
/// Passed by reference inside the call context; adapters never read global
/// configuration.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Months probed by per-month enumerators
    pub lookback_months: u32,
    /// Years listed by per-year enumerators
    pub recent_years: u32,
    /// Delay between generation status checks
    pub poll_interval: Duration,
    /// Generation status checks before timing out
    pub poll_max_attempts: u32,
    /// Per-bank account type overrides
    pub account_types: HashMap<String, HashMap<String, AccountType>>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        AppConfig::default().adapter_settings()
    }
}

impl AdapterSettings {
    /// Account type overrides configured for `bank_id`.
    #[must_use]
    pub fn type_overrides(&self, bank_id: &str) -> Option<&HashMap<String, AccountType>> {
        self.account_types.get(bank_id)
    }
}

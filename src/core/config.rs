//! Configuration management

use crate::cache::QueryOptions;
use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Per-resource cache windows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub summary: PolicyConfig,
    pub recent_transactions: PolicyConfig,
    pub working_capital: PolicyConfig,
    pub wallet: PolicyConfig,
    pub scheduled_transfers: PolicyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Seconds before a fetched value is considered stale
    pub stale_secs: u64,
    /// Seconds an unobserved entry survives before eviction
    pub evict_secs: u64,
    /// Retries after the first failed attempt
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Base delay for exponential retry backoff (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// How long a touch tooltip lingers after the finger lifts
    pub dismiss_delay_ms: u64,
    /// Viewports at or below this width are treated as touch devices
    pub mobile_breakpoint: u32,
    /// Fallback viewport when the presentation layer reports none
    pub default_width: f64,
    pub default_height: f64,
}

fn default_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl PolicyConfig {
    pub const fn minutes(stale: u64, evict: u64) -> Self {
        Self {
            stale_secs: stale * 60,
            evict_secs: evict * 60,
            retries: 2,
            retry_delay_ms: 1000,
        }
    }

    pub fn to_options(&self) -> QueryOptions {
        QueryOptions::new(
            Duration::from_secs(self.stale_secs),
            Duration::from_secs(self.evict_secs),
        )
        .with_retries(self.retries)
        .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::minutes(0, 5)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            summary: PolicyConfig::minutes(5, 10),
            recent_transactions: PolicyConfig::minutes(2, 5),
            working_capital: PolicyConfig::minutes(10, 30),
            wallet: PolicyConfig::minutes(15, 30),
            scheduled_transfers: PolicyConfig::minutes(3, 10),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            dismiss_delay_ms: 2000,
            mobile_breakpoint: 768,
            default_width: 600.0,
            default_height: 280.0,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var("FINBOARD_API_URL") {
            config.api.base_url = url;
        }

        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::finboard_home()?.join("config.toml"))
    }

    /// Get the finboard home directory
    pub fn finboard_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("FINBOARD_HOME") {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("dev", "finboard", "finboard")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine finboard home directory".to_string(),
            })
    }

    /// Persisted session record (token + user profile)
    pub fn credentials_path() -> Result<PathBuf> {
        Ok(Self::finboard_home()?.join("session.json"))
    }

    /// Ensure home directory exists
    pub fn ensure_home() -> Result<()> {
        let home = Self::finboard_home()?;
        if !home.exists() {
            std::fs::create_dir_all(&home)?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Route the presentation layer shows when the session is gone
pub const SIGN_IN_ROUTE: &str = "/signin";

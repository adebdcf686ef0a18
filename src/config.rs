use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deadline::DEFAULT_SAFETY_MARGIN;

/// Configuration file structure for bluegreen.
///
/// Holds the endpoints of the three external services and the polling and
/// retry knobs shared by every stage. Configuration files are loaded from the
/// current directory, the user config directory, or a specified path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Application-hosting control plane
    #[serde(default = "default_control_plane")]
    pub control_plane: EndpointConfig,

    /// Object storage holding the CNAME record
    #[serde(default = "default_storage")]
    pub storage: EndpointConfig,

    /// Pipeline orchestrator receiving job results
    #[serde(default = "default_orchestrator")]
    pub orchestrator: EndpointConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointConfig {
    /// Base URL of the service API
    pub base_url: String,

    /// Bearer token for the service
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollingConfig {
    /// Seconds between two status queries
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on a single readiness wait, on top of the job deadline
    pub max_wait_secs: Option<u64>,

    /// How long before the platform's hard limit a timeout gets reported
    #[serde(default = "default_safety_margin_ms")]
    pub safety_margin_ms: u64,

    /// Budget used when the platform does not pass the remaining time
    #[serde(default = "default_budget_secs")]
    pub default_budget_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Per-request timeout, so a stalled service cannot eat the job budget
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_wait_secs: None,
            safety_margin_ms: default_safety_margin_ms(),
            default_budget_secs: default_budget_secs(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }

    pub fn default_budget(&self) -> Duration {
        Duration::from_secs(self.default_budget_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_secs: default_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_plane: default_control_plane(),
            storage: default_storage(),
            orchestrator: default_orchestrator(),
            polling: PollingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

fn endpoint(base_url: &str) -> EndpointConfig {
    EndpointConfig {
        base_url: base_url.to_string(),
        token: None,
    }
}

fn default_control_plane() -> EndpointConfig {
    endpoint("http://localhost:4566/hosting/")
}

fn default_storage() -> EndpointConfig {
    endpoint("http://localhost:4566/storage/")
}

fn default_orchestrator() -> EndpointConfig {
    endpoint("http://localhost:4566/pipeline/")
}

fn default_interval_secs() -> u64 {
    10
}

fn default_safety_margin_ms() -> u64 {
    DEFAULT_SAFETY_MARGIN.as_millis() as u64
}

fn default_budget_secs() -> u64 {
    900
}

fn default_max_retries() -> u32 {
    3
}

fn default_delay_secs() -> u64 {
    2
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./bluegreen.toml
    /// 3. ./bluegreen.json
    /// 4. ./bluegreen.yaml
    /// 5. ./bluegreen.yml
    /// 6. `<user config dir>/bluegreen/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "bluegreen.toml",
            "bluegreen.json",
            "bluegreen.yaml",
            "bluegreen.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = user_config_path() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bluegreen").join("config.toml"))
}

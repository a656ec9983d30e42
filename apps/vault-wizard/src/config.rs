//! # Configuration
//!
//! Optional TOML file (`vault-wizard.toml`) with `VAULT_WIZARD_*`
//! environment overrides.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [api]
//! rate_limit = 100        # requests/second, 0 disables
//! max_sessions = 1024
//! cors_origins = ["http://localhost:4200"]
//!
//! [wizard]
//! default_features = ["secrets", "authentication"]
//! ```
//!
//! ## Environment Overrides
//!
//! - `VAULT_WIZARD_API_KEY`: bearer key required on every endpoint but `/health`
//! - `VAULT_WIZARD_RATE_LIMIT`: requests per second
//! - `VAULT_WIZARD_CORS_ORIGINS`: comma-separated origins, or `*`
//! - `VAULT_WIZARD_LOG_FORMAT`: `json` for JSON logs (read in `main`)

use serde::{Deserialize, Serialize};
use std::path::Path;
use vault_wizard_core::{Feature, WizardError};

/// Largest config file accepted.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

pub const ENV_API_KEY: &str = "VAULT_WIZARD_API_KEY";
pub const ENV_RATE_LIMIT: &str = "VAULT_WIZARD_RATE_LIMIT";
pub const ENV_CORS_ORIGINS: &str = "VAULT_WIZARD_CORS_ORIGINS";
pub const ENV_LOG_FORMAT: &str = "VAULT_WIZARD_LOG_FORMAT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub wizard: WizardConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Requests per second across all clients; 0 disables limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Concurrent wizard sessions kept in memory.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Allowed CORS origins. `None` means localhost only; `["*"]` allows all.
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,

    /// Bearer key. Only ever taken from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            max_sessions: default_max_sessions(),
            cors_origins: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Plan selected for new sessions that do not bring their own.
    #[serde(default)]
    pub default_features: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_rate_limit() -> u32 {
    100
}

fn default_max_sessions() -> usize {
    1024
}

impl Config {
    /// Parse a config document.
    pub fn from_toml(text: &str) -> Result<Self, WizardError> {
        let config: Config =
            toml::from_str(text).map_err(|e| WizardError::ConfigError(e.to_string()))?;
        config.default_features()?;
        Ok(config)
    }

    /// Load `path` (or defaults when `None`), then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, WizardError> {
        let mut config = match path {
            Some(path) => {
                let metadata = std::fs::metadata(path).map_err(|e| {
                    WizardError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
                })?;
                if metadata.len() > MAX_CONFIG_FILE_SIZE {
                    return Err(WizardError::ConfigError(format!(
                        "Config file of {} bytes exceeds maximum {} bytes",
                        metadata.len(),
                        MAX_CONFIG_FILE_SIZE
                    )));
                }
                let text = std::fs::read_to_string(path).map_err(|e| {
                    WizardError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
                })?;
                tracing::info!(path = %path.display(), "loaded configuration file");
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay `VAULT_WIZARD_*` variables.
    pub fn apply_env(&mut self) {
        self.api.api_key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.is_empty());

        if let Ok(raw) = std::env::var(ENV_RATE_LIMIT) {
            match raw.trim().parse() {
                Ok(rps) => self.api.rate_limit = rps,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid {}", ENV_RATE_LIMIT),
            }
        }

        if let Ok(raw) = std::env::var(ENV_CORS_ORIGINS) {
            self.api.cors_origins = Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
    }

    /// The configured default plan, parsed.
    pub fn default_features(&self) -> Result<Vec<Feature>, WizardError> {
        self.wizard
            .default_features
            .iter()
            .map(|name| name.parse())
            .collect()
    }
}

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub gateway: GatewayConfig,
    pub history: HistoryConfig,
    pub normalize: NormalizeConfig,
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

/// Publisher authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared publisher secret. Empty means "use the environment variable".
    pub secret: String,
    /// Environment variable consulted before the inline secret.
    pub secret_env: String,
}

/// Session accumulation and debounce timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_ms: u64,
    pub debounce_ms: u64,
}

/// Translation gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub api_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

/// Translation history replay configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

/// Transcript normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Misrecognition corrections applied before translation.
    pub substitutions: BTreeMap<String, String>,
    /// Closing filler phrases stripped on top of the built-in list.
    pub extra_fillers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::BIND_ADDR.to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            secret_env: defaults::SECRET_ENV.to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: defaults::IDLE_TIMEOUT_MS,
            debounce_ms: defaults::DEBOUNCE_MS,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::GATEWAY_API_URL.to_string(),
            model: defaults::GATEWAY_MODEL.to_string(),
            api_key_env: defaults::GATEWAY_API_KEY_ENV.to_string(),
            timeout_secs: defaults::GATEWAY_TIMEOUT_SECS,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::HISTORY_CAPACITY,
        }
    }
}

impl AuthConfig {
    /// Resolve the effective publisher secret.
    ///
    /// The environment variable named by `secret_env` wins over the inline
    /// value. `None` means no secret is configured and every authenticate
    /// is rejected.
    pub fn resolve_secret(&self) -> Option<String> {
        if let Ok(secret) = std::env::var(&self.secret_env)
            && !secret.is_empty()
        {
            return Some(secret);
        }
        if !self.secret.is_empty() {
            return Some(self.secret.clone());
        }
        None
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Validate policy values that would break the relay silently.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.session.idle_timeout_ms == 0 {
            return Err(crate::error::RelayError::ConfigInvalidValue {
                key: "session.idle_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.session.debounce_ms == 0 {
            return Err(crate::error::RelayError::ConfigInvalidValue {
                key: "session.debounce_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.session.debounce_ms >= self.session.idle_timeout_ms {
            return Err(crate::error::RelayError::ConfigInvalidValue {
                key: "session.debounce_ms".to_string(),
                message: "must be shorter than session.idle_timeout_ms".to_string(),
            });
        }
        if self.gateway.timeout_secs == 0 {
            return Err(crate::error::RelayError::ConfigInvalidValue {
                key: "gateway.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - TONGYEOK_BIND → server.bind
    /// - TONGYEOK_GATEWAY_MODEL → gateway.model
    /// - TONGYEOK_GATEWAY_URL → gateway.api_url
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bind) = std::env::var("TONGYEOK_BIND")
            && !bind.is_empty()
        {
            self.server.bind = bind;
        }

        if let Ok(model) = std::env::var("TONGYEOK_GATEWAY_MODEL")
            && !model.is_empty()
        {
            self.gateway.model = model;
        }

        if let Ok(url) = std::env::var("TONGYEOK_GATEWAY_URL")
            && !url.is_empty()
        {
            self.gateway.api_url = url;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/tongyeok/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("tongyeok")
            .join("config.toml")
    }
}

//! Server configuration.
//!
//! Loading is layered, highest precedence first:
//! - environment variables
//! - the TOML file named by `CSRKIT_CONFIG`, else `./csrkit.toml` when present
//! - built-in defaults
//!
//! The resulting [`ServerConfig`] is validated once and handed to the router;
//! nothing reads configuration from global state afterwards.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assessment::RatingPolicy;
use crate::naming::NamingConfig;

pub const CONFIG_PATH_ENV: &str = "CSRKIT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./csrkit.toml";
pub const PORT_ENV: &str = "PORT";
pub const BIND_ADDR_ENV: &str = "CSRKIT_BIND_ADDR";
pub const ALLOWED_ORIGINS_ENV: &str = "CSRKIT_ALLOWED_ORIGINS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("Missing required configuration: {key} ({hint})")]
    MissingRequired { key: String, hint: String },
}

impl ConfigError {
    fn invalid(key: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl NetworkConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|e| ConfigError::invalid("network.bind_addr", &self.bind_addr, format!("{e}")))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = lookup(PORT_ENV) {
            self.port = val.trim().parse().map_err(|e| {
                ConfigError::invalid(PORT_ENV, &val, format!("must be a valid port number: {e}"))
            })?;
        }
        if let Some(val) = lookup(BIND_ADDR_ENV) {
            self.bind_addr = val;
        }
        Ok(())
    }
}

/// Browser origins allowed to call the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(ALLOWED_ORIGINS_ENV) {
            self.allowed_origins = val.split(',').map(str::to_string).collect();
            self.normalize();
            self.allowed_origins.retain(|origin| !origin.is_empty());
        }
    }

    /// Browsers send `Origin` without a trailing slash.
    fn normalize(&mut self) {
        for origin in &mut self.allowed_origins {
            *origin = origin.trim().trim_end_matches('/').to_string();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for origin in &self.allowed_origins {
            if origin.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "cors.allowed_origins",
                    origin,
                    "origins must not be empty",
                ));
            }
            if origin.contains('*') {
                return Err(ConfigError::invalid(
                    "cors.allowed_origins",
                    origin,
                    "wildcards are not allowed, list each origin",
                ));
            }
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(ConfigError::invalid(
                    "cors.allowed_origins",
                    origin,
                    "origins must start with http:// or https://",
                ));
            }
            if origin.ends_with('/') {
                return Err(ConfigError::invalid(
                    "cors.allowed_origins",
                    origin,
                    "origins must not end with '/'",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub policy: RatingPolicy,
    #[serde(default)]
    pub naming: NamingConfig,
}

impl ServerConfig {
    /// Defaults, then the TOML file, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an explicit variable lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => {
                if !Path::new(&path).exists() {
                    return Err(ConfigError::MissingRequired {
                        key: CONFIG_PATH_ENV.to_string(),
                        hint: format!("{path} does not exist"),
                    });
                }
                tracing::info!("Loading configuration from {}: {}", CONFIG_PATH_ENV, path);
                Self::from_toml_file(&path)?
            }
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                tracing::info!("Loading configuration from: {}", DEFAULT_CONFIG_PATH);
                Self::from_toml_file(DEFAULT_CONFIG_PATH)?
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::invalid("config_file", path.display().to_string(), format!("Failed to read file: {e}"))
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::InvalidValue { reason, .. } => {
                ConfigError::invalid("config_file", path.display().to_string(), reason)
            }
            other => other,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::invalid("config_file", "<inline>", format!("Failed to parse TOML: {e}")))?;
        config.cors.normalize();
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        self.network.apply_overrides(lookup)?;
        self.cors.apply_overrides(lookup);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.socket_addr()?;
        self.cors.validate()?;
        self.policy
            .validate()
            .map_err(|reason| ConfigError::invalid("policy", "rating policy", reason))?;
        if self.naming.base_domain.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "naming.base_domain".to_string(),
                hint: "domain suggestions need a base domain".to_string(),
            });
        }
        Ok(())
    }
}

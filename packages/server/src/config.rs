//! Server configuration.
//!
//! Read from an optional TOML file named by `PARCEL_MAP_CONFIG`, then
//! overridden by `BIND_ADDR`, `PORT`, `PARCELS_PATH`, and `LISTINGS_PATH`.

use std::path::PathBuf;

use parcel_map_engine::QueryLimits;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the TOML config file.
pub const CONFIG_ENV: &str = "PARCEL_MAP_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid PORT value: {0:?}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// `GeoJSON` `FeatureCollection` loaded into the engine at startup.
    pub parcels_path: Option<PathBuf>,
    /// JSON array of listings used for the statistics endpoints.
    pub listings_path: Option<PathBuf>,
    pub limits: QueryLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            parcels_path: None,
            listings_path: None,
            limits: QueryLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `var` to look up environment variables.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn load(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match var(CONFIG_ENV) {
            Some(path) => {
                log::info!("Reading config from {path}");
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };

        if let Some(bind_addr) = var("BIND_ADDR") {
            config.bind_addr = bind_addr;
        }
        if let Some(port) = var("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if let Some(path) = var("PARCELS_PATH") {
            config.parcels_path = Some(path.into());
        }
        if let Some(path) = var("LISTINGS_PATH") {
            config.listings_path = Some(path.into());
        }

        Ok(config)
    }

    /// Parses a TOML config document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(s)?)
    }
}

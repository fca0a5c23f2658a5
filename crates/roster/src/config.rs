//! Configuration management for roster.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::DEFAULT_POOL_SIZE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "roster";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "students.db";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5050;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. The conventional `PORT` and `DATABASE_PATH` variables
/// 2. Environment variables prefixed with `ROSTER_`, `__` separating
///    sections (`ROSTER_SERVER__PORT`)
/// 3. TOML config file at `~/.config/roster/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Record store configuration.
    pub store: StoreConfig,
    /// Client configuration.
    pub client: ClientConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

/// Record store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/roster/students.db`
    pub database_path: Option<PathBuf>,
    /// Maximum number of pooled connections.
    pub pool_size: u32,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the resource API.
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://localhost:{DEFAULT_PORT}"),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment for the given config file.
    #[must_use]
    pub fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file).nested())
            .merge(Env::prefixed("ROSTER_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
            .merge(
                Env::raw()
                    .only(&["DATABASE_PATH"])
                    .map(|_| "store.database_path".into()),
            )
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.store.pool_size == 0 {
            return Err(Error::ConfigValidation {
                message: "store.pool_size must be greater than 0".to_string(),
            });
        }

        if reqwest::Url::parse(&self.client.base_url).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid client.base_url: {}", self.client.base_url),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.host` is not an IP address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!("invalid server.host: {}", self.server.host),
            })
    }
}

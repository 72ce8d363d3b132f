//! Configuration for the numpool service
//!
//! TOML file loading with environment variable overrides and validation.

use crate::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Game rules: stakes, payout math, reward expiry, admin allow-list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Minimum stake per bet, in the smallest currency unit
    pub min_stake: u64,
    /// Fixed multiplier applied uniformly to every winning bet of a round
    pub payout_multiplier: u64,
    /// Hours after round completion before an issued reward code expires
    pub reward_expiry_hours: i64,
    /// Account ids allowed to create, activate, settle and cancel rounds
    pub admin_accounts: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_stake: 10_000,
            payout_multiplier: 80,
            reward_expiry_hours: 72,
            admin_accounts: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./numpool_data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CoreResult<ServiceConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            ServiceConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> CoreResult<ServiceConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::InvalidInput(format!("failed to read {}: {}", path, e))
        })?;

        toml::from_str(&content)
            .map_err(|e| CoreError::InvalidInput(format!("failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(&self, config: &mut ServiceConfig) -> CoreResult<()> {
        if let Ok(dir) = env::var("NUMPOOL_DATA_DIR") {
            config.storage.data_dir = dir;
        }
        if let Ok(host) = env::var("NUMPOOL_API_HOST") {
            config.api.host = host;
        }
        if let Ok(port) = env::var("NUMPOOL_API_PORT") {
            config.api.port = port.parse().map_err(|_| {
                CoreError::InvalidInput(format!("NUMPOOL_API_PORT: invalid port '{}'", port))
            })?;
        }
        if let Ok(stake) = env::var("NUMPOOL_MIN_STAKE") {
            config.game.min_stake = stake.parse().map_err(|_| {
                CoreError::InvalidInput(format!("NUMPOOL_MIN_STAKE: invalid value '{}'", stake))
            })?;
        }
        if let Ok(mult) = env::var("NUMPOOL_PAYOUT_MULTIPLIER") {
            config.game.payout_multiplier = mult.parse().map_err(|_| {
                CoreError::InvalidInput(format!(
                    "NUMPOOL_PAYOUT_MULTIPLIER: invalid value '{}'",
                    mult
                ))
            })?;
        }
        if let Ok(admins) = env::var("NUMPOOL_ADMIN_ACCOUNTS") {
            config.game.admin_accounts = admins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Ok(())
    }

    fn validate(&self, config: &ServiceConfig) -> CoreResult<()> {
        if config.game.min_stake == 0 {
            return Err(CoreError::InvalidInput(
                "game.min_stake cannot be zero".to_string(),
            ));
        }
        if config.game.payout_multiplier == 0 {
            return Err(CoreError::InvalidInput(
                "game.payout_multiplier cannot be zero".to_string(),
            ));
        }
        if config.game.reward_expiry_hours <= 0 {
            return Err(CoreError::InvalidInput(
                "game.reward_expiry_hours must be positive".to_string(),
            ));
        }
        if config.storage.data_dir.is_empty() {
            return Err(CoreError::InvalidInput(
                "storage.data_dir cannot be empty".to_string(),
            ));
        }
        if config.api.port == 0 {
            return Err(CoreError::InvalidInput(
                "api.port cannot be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &ServiceConfig, path: &str) -> CoreResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            CoreError::InvalidInput(format!("failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            CoreError::InvalidInput(format!("failed to write to {}: {}", path, e))
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> CoreResult<()> {
    let config = ServiceConfig::default();
    ConfigLoader::new().save(&config, path)
}

//! Server configuration module
//!
//! Handles loading and parsing of server configuration from files and environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::game::sync::SyncConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Server name displayed in logs
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// World ID (1-255)
    #[serde(default = "default_world_id")]
    pub world_id: u8,

    /// Maximum number of players
    #[serde(default = "default_max_players")]
    pub max_players: u16,

    /// Game tick rate in milliseconds
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,

    /// Player synchronization settings
    #[serde(default)]
    pub sync: SyncSettings,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

/// Player synchronization settings (`[sync]` table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// How far (in tiles, per axis) another player stays visible
    #[serde(default = "default_view_distance")]
    pub view_distance: u16,

    /// Lowest region-relative tile before the region shifts down
    #[serde(default = "default_region_min_tile")]
    pub region_min_tile: u16,

    /// Highest region-relative tile before the region shifts up
    #[serde(default = "default_region_max_tile")]
    pub region_max_tile: u16,
}

fn default_server_name() -> String {
    "Rustscape".to_string()
}

fn default_world_id() -> u8 {
    1
}

fn default_max_players() -> u16 {
    2000
}

fn default_tick_rate() -> u64 {
    600 // 600ms = standard RS tick rate
}

fn default_view_distance() -> u16 {
    15
}

fn default_region_min_tile() -> u16 {
    15
}

fn default_region_max_tile() -> u16 {
    86
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            view_distance: default_view_distance(),
            region_min_tile: default_region_min_tile(),
            region_max_tile: default_region_max_tile(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config/server.toml"),
            server_name: default_server_name(),
            world_id: default_world_id(),
            max_players: default_max_players(),
            tick_rate_ms: default_tick_rate(),
            sync: SyncSettings::default(),
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment variables
    pub async fn load() -> Result<Self> {
        let config_path = env::var("RUSTSCAPE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/server.toml"));

        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| {
                    format!("Failed to read config file: {}", config_path.display())
                })?;

            Self::from_toml(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.config_path = config_path;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("RUSTSCAPE_SERVER_NAME") {
            self.server_name = val;
        }
        if let Ok(val) = env::var("RUSTSCAPE_WORLD_ID") {
            if let Ok(id) = val.parse() {
                self.world_id = id;
            }
        }
        if let Ok(val) = env::var("RUSTSCAPE_TICK_RATE") {
            if let Ok(rate) = val.parse() {
                self.tick_rate_ms = rate;
            }
        }
        if let Ok(val) = env::var("RUSTSCAPE_MAX_PLAYERS") {
            if let Ok(max) = val.parse() {
                self.max_players = max;
            }
        }
        if let Ok(val) = env::var("RUSTSCAPE_VIEW_DISTANCE") {
            if let Ok(distance) = val.parse() {
                self.sync.view_distance = distance;
            }
        }
        if let Ok(val) = env::var("RUSTSCAPE_DEBUG") {
            self.debug = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.world_id == 0 {
            anyhow::bail!("World ID must be between 1 and 255");
        }

        // Index 2047 terminates the player list on the wire
        if self.max_players == 0 || self.max_players > 2046 {
            anyhow::bail!("Max players must be between 1 and 2046");
        }

        if self.tick_rate_ms < 100 || self.tick_rate_ms > 5000 {
            anyhow::bail!("Tick rate must be between 100ms and 5000ms");
        }

        // Relative offsets are written as 5-bit signed values
        if self.sync.view_distance == 0 || self.sync.view_distance > 15 {
            anyhow::bail!("View distance must be between 1 and 15 tiles");
        }

        if self.sync.region_min_tile >= self.sync.region_max_tile
            || self.sync.region_max_tile > 127
        {
            anyhow::bail!("Region thresholds must satisfy min < max <= 127");
        }

        Ok(())
    }

    /// Build the synchronization configuration handed to the world
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            view_distance: self.sync.view_distance,
            region_min_tile: self.sync.region_min_tile,
            region_max_tile: self.sync.region_max_tile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server_name, "Rustscape");
        assert_eq!(config.world_id, 1);
        assert_eq!(config.tick_rate_ms, 600);
        assert_eq!(config.sync.view_distance, 15);
        assert_eq!(config.sync.region_min_tile, 15);
        assert_eq!(config.sync.region_max_tile, 86);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ServerConfig::from_toml(
            r#"
            server_name = "Test"
            tick_rate_ms = 300

            [sync]
            view_distance = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.server_name, "Test");
        assert_eq!(config.tick_rate_ms, 300);
        assert_eq!(config.sync.view_distance, 10);
        // Unspecified values fall back to defaults
        assert_eq!(config.sync.region_max_tile, 86);
        assert_eq!(config.world_id, 1);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.world_id = 0;
        assert!(config.validate().is_err());
        config.world_id = 1;

        config.sync.view_distance = 16;
        assert!(config.validate().is_err());
        config.sync.view_distance = 15;

        config.max_players = 2047;
        assert!(config.validate().is_err());
        config.max_players = 2000;

        config.sync.region_min_tile = 90;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        env::set_var("RUSTSCAPE_CONFIG", "does/not/exist.toml");
        let config = tokio_test::block_on(ServerConfig::load()).unwrap();
        env::remove_var("RUSTSCAPE_CONFIG");

        assert_eq!(config.config_path, PathBuf::from("does/not/exist.toml"));
        assert_eq!(config.sync.view_distance, 15);
    }

    #[test]
    fn test_sync_config() {
        let mut config = ServerConfig::default();
        config.sync.view_distance = 8;

        let sync = config.sync_config();
        assert_eq!(sync.view_distance, 8);
        assert_eq!(sync.region_min_tile, 15);
        assert_eq!(sync.region_max_tile, 86);
    }
}

//! Persistent application configuration
//!
//! Stores the listen address and the game tunables in a JSON file at
//! `<config_dir>/pushup-player/config.json`, or wherever `--config` points.

use pushup_core::GameConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5683
}

/// Persistent application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP transport binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Port the HTTP transport listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Detector and indicator tunables
    #[serde(default)]
    pub game: GameConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            game: GameConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file path: `<config_dir>/pushup-player/config.json`
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pushup-player")
            .join("config.json")
    }

    /// Load config from `path` (or the default path), falling back to defaults on any error
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map_or_else(Self::path, Path::to_path_buf);
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(mut config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config.game = config.game.validated();
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }
}

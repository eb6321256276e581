//! Configuration loading and persistence.
//!
//! Handles reading and writing the workdistro-notify configuration
//! file. The auth token is never written to disk: it arrives via
//! `WORKDISTRO_TOKEN` or a CLI flag and lives only in memory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{fs, path::PathBuf};

use crate::channel::ChannelConfig;
use crate::constants::{DEFAULT_ENDPOINT, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS};

/// Configuration for the workdistro-notify CLI.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Base URL of the notification server (`wss://` or `https://`).
    pub endpoint: String,
    /// Auth token - NOT serialized to disk (env var or flag only).
    #[serde(skip)]
    pub token: String,
    /// Delay before the first reconnection attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Ceiling for the reconnection delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Default recipient role for the CLI (`client` or `worker`).
    pub role: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: String::new(),
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            role: "client".to_string(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `#[cfg(test)]` (unit tests): `tmp/workdistro-test` inside the repo
    /// 2. `WORKDISTRO_CONFIG_DIR` env var: explicit override
    /// 3. Default: platform config dir (macOS: ~/Library/Application Support/workdistro)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = {
            #[cfg(test)]
            {
                // Unit tests: use repo's tmp/ directory
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/workdistro-test")
            }

            #[cfg(not(test))]
            {
                if let Ok(test_dir) = std::env::var("WORKDISTRO_CONFIG_DIR") {
                    // Explicit override via env var
                    PathBuf::from(test_dir)
                } else {
                    // Production: use platform-standard config directory
                    dirs::config_dir()
                        .context("Could not determine config directory")?
                        .join("workdistro")
                }
            }
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_else(|_| Self::default());
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");
        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            serde_json::from_str(&content).context("Config file is not valid JSON")
        } else {
            anyhow::bail!("Config file not found")
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("WORKDISTRO_ENDPOINT") {
            self.endpoint = endpoint;
        }

        // Token from env var (for CI/CD and headless use)
        if let Ok(token) = std::env::var("WORKDISTRO_TOKEN") {
            self.token = token;
        }

        if let Ok(role) = std::env::var("WORKDISTRO_ROLE") {
            self.role = role;
        }

        if let Ok(initial) = std::env::var("WORKDISTRO_INITIAL_BACKOFF_MS") {
            if let Ok(ms) = initial.parse::<u64>() {
                self.initial_backoff_ms = ms;
            }
        }

        if let Ok(max) = std::env::var("WORKDISTRO_MAX_BACKOFF_MS") {
            if let Ok(ms) = max.parse::<u64>() {
                self.max_backoff_ms = ms;
            }
        }
    }

    /// Persists the current configuration to disk.
    /// Note: the token is never saved.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_dir()?.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;

        // Set restrictive permissions (owner read/write only)
        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Check if an auth token is present.
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// The channel-facing slice of this configuration.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            endpoint: self.endpoint.clone(),
            initial_backoff_ms: self.initial_backoff_ms,
            max_backoff_ms: self.max_backoff_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint, "wss://workdistro-1.onrender.com");
        assert_eq!(config.initial_backoff_ms, 1_000);
        assert_eq!(config.max_backoff_ms, 30_000);
        assert_eq!(config.role, "client");
    }

    #[test]
    fn test_config_serialization_excludes_token() {
        let config = Config {
            token: "secret_token".to_string(),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();

        // Token should NOT be in the JSON
        assert!(!json.contains("secret_token"));
        assert!(!json.contains("token"));
    }

    #[test]
    fn test_has_token() {
        let mut config = Config::default();
        assert!(!config.has_token());

        config.token = "eyJ0eXAiOiJKV1QifQ.abc.def".to_string();
        assert!(config.has_token());

        config.token.clear();
        assert!(!config.has_token());
    }

    #[test]
    fn test_channel_config_carries_backoff_bounds() {
        let config = Config {
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
            ..Config::default()
        };

        let channel_config = config.channel_config();
        assert_eq!(channel_config.endpoint, config.endpoint);
        assert_eq!(channel_config.initial_backoff_ms, 250);
        assert_eq!(channel_config.max_backoff_ms, 4_000);
    }
}

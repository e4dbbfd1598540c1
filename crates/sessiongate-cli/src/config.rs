//! CLI configuration management.
//!
//! Holds the API base URL override and the last email used to log in.
//! Stored at `~/.config/sessiongate/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sessiongate_core::config::API_BASE_ENV;
use sessiongate_core::ClientConfig;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "sessiongate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CliConfig {
    pub api_base: Option<String>,
    pub last_email: Option<String>,
}

impl CliConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where durable session values are written.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// `SESSIONGATE_API_BASE` wins, then the saved override, then the build-time default.
    pub fn client_config(&self) -> ClientConfig {
        let env_set = std::env::var(API_BASE_ENV)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        match &self.api_base {
            Some(base) if !env_set => ClientConfig::new(base),
            _ => ClientConfig::from_env(),
        }
    }
}

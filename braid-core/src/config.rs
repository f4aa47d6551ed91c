//! Configuration management for Braid
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (BRAID_*)
//! 3. Config file (~/.config/braid/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::SendMode;
use crate::{Error, Result};

/// Where repositories and the database live
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root data directory
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("braid"),
        }
    }
}

/// Commit identity and branch policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Author name for every commit the engine makes
    pub author_name: String,

    /// Author email for every commit the engine makes
    pub author_email: String,

    /// Branch that pull requests merge into
    pub target_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            author_name: "Braid".to_string(),
            author_email: "braid@localhost".to_string(),
            target_branch: "main".to_string(),
        }
    }
}

/// Workflow defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Send mode used when a request does not name one
    pub send_mode: SendMode,
}

/// Response completion detection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// How often the platform page is sampled
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Unchanged samples required before a response counts as complete
    pub stable_polls: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            stable_polls: 3,
        }
    }
}

/// Stdio bridge settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long to wait for a tab to acknowledge a command
    #[serde(with = "humantime_serde")]
    pub delivery_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub git: GitConfig,
    pub workflow: WorkflowConfig,
    pub reader: ReaderConfig,
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/braid/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("braid").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - BRAID_DATA_DIR: Root data directory
    /// - BRAID_SEND_MODE: `manual` or `auto`
    /// - BRAID_TARGET_BRANCH: Branch pull requests merge into
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(dir) = std::env::var("BRAID_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(mode) = std::env::var("BRAID_SEND_MODE") {
            self.workflow.send_mode = mode.parse().map_err(Error::Config)?;
        }

        if let Ok(branch) = std::env::var("BRAID_TARGET_BRANCH") {
            self.git.target_branch = branch;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, data_dir: Option<PathBuf>, send_mode: Option<SendMode>) -> Self {
        if let Some(dir) = data_dir {
            self.storage.data_dir = dir;
        }

        if let Some(mode) = send_mode {
            self.workflow.send_mode = mode;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(data_dir: Option<PathBuf>, send_mode: Option<SendMode>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()?
            .with_cli_overrides(data_dir, send_mode))
    }

    /// Directory holding one working tree per repo
    pub fn repos_dir(&self) -> PathBuf {
        self.storage.data_dir.join("repos")
    }

    /// SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.storage.data_dir.join("braid.db")
    }
}

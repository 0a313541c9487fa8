//! Configuration for the client core
//!
//! Loads configuration from TOML file at `~/.config/area/clients.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::client_flags::WindowType;
use crate::wm::focus::{FocusPolicy, SuccessorPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hints: HintsConfig,
    pub focus: FocusConfig,
    pub manage: ManageConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("clients.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Size hint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintsConfig {
    /// Honor size hints for newly managed clients
    pub honor_size_hints: bool,
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self { honor_size_hints: true }
    }
}

/// Focus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub policy: FocusPolicy,
    /// What gets focus when the focused client goes away
    pub successor: SuccessorPolicy,
    pub history_size: usize,
    /// Raise window when focused
    pub raise_on_focus: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            policy: FocusPolicy::ClickToFocus,
            successor: SuccessorPolicy::History,
            history_size: 20,
            raise_on_focus: true,
        }
    }
}

/// Management eligibility configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManageConfig {
    /// Override-redirect windows of these types are managed anyway
    pub popup_types: Vec<String>,
}

impl Default for ManageConfig {
    fn default() -> Self {
        Self {
            popup_types: ["dropdown_menu", "popup_menu", "tooltip", "notification", "combo", "dnd"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ManageConfig {
    /// Resolve type names, skipping unknown ones.
    pub fn popup_types(&self) -> Vec<WindowType> {
        self.popup_types
            .iter()
            .filter_map(|name| {
                let parsed = WindowType::from_name(name);
                if parsed.is_none() {
                    warn!("Unknown window type {:?} in manage.popup_types", name);
                }
                parsed
            })
            .collect()
    }
}

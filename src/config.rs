use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_height: Option<u32>,

    /// Scripting host used for notifications instead of the tray's own popups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_program: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_label: Option<String>,

    #[serde(default = "default_true")]
    pub title_item: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            icon_width: None,
            icon_height: None,
            notification_program: None,
            tooltip: None,
            exit_label: None,
            title_item: true,
        }
    }
}

impl Config {
    #[cfg(debug_assertions)]
    pub const FILENAME: &'static str = "tray-bridge.debug.toml";
    #[cfg(not(debug_assertions))]
    pub const FILENAME: &'static str = "tray-bridge.toml";

    pub fn path() -> anyhow::Result<PathBuf> {
        dirs::home_dir()
            .context("Could not determine home directory")
            .map(|dir| dir.join(".config"))
            .map(|dir| dir.join(Self::FILENAME))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Self::path()?)
    }

    pub fn load_from(config_file: PathBuf) -> anyhow::Result<Self> {
        if config_file.exists() {
            tracing::info!("Loading config from {}", config_file.display());

            let content = std::fs::read_to_string(&config_file)?;
            toml::from_str(&content)
                .with_context(|| format!("Invalid config at {}", config_file.display()))
        } else {
            tracing::info!(
                "Config file not found at {}, using default config",
                config_file.display()
            );

            Ok(Config::default())
        }
    }
}

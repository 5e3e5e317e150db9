//! Console settings

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use onair_core::ControlConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Console settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    /// Control-plane timing, transition and health settings
    #[serde(default)]
    pub control: ControlConfig,
    /// Where the state snapshot lives (defaults to the XDG data directory)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// JSON macro library merged into the restored library on startup
    #[serde(default)]
    pub macro_library: Option<PathBuf>,
    /// Print transition progress events, not just log entries
    #[serde(default)]
    pub show_progress: bool,
}

impl Settings {
    /// Get the XDG config directory for onair
    /// Uses $XDG_CONFIG_HOME/onair on Linux/macOS, falls back to ~/.config/onair
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("onair"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("onair"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Directory holding the state snapshot
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("onair")))
            .or_else(Self::config_dir)
    }

    /// Load settings from disk
    ///
    /// On first run the defaults are written out so there is a file to
    /// edit. Unreadable or malformed settings fall back to defaults.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).unwrap_or_default(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let settings = Self::default();
                match settings.save_to(path) {
                    Ok(()) => info!("Wrote default settings to {}", path.display()),
                    Err(e) => warn!("Could not write default settings: {:#}", e),
                }
                settings
            }
            Err(e) => {
                warn!("Could not read settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Ignoring malformed settings: {}", e);
                None
            }
        }
    }

    /// Save settings to `path`, creating its directory
    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).context("Failed to write settings")?;

        Ok(())
    }
}

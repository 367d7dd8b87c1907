//! Application settings

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use baud_detect::ScannerConfig;
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Watch mode polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Show resolved device names in `list` by default
    #[serde(default)]
    pub show_names: bool,
    /// Show non-USB ports in `list` by default
    #[serde(default)]
    pub show_all: bool,
    /// Skip ports whose name contains any of these patterns
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// usb.ids file to use instead of the bundled catalog
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            show_names: false,
            show_all: false,
            skip_patterns: Vec::new(),
            catalog_path: None,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for baud
    /// Uses $XDG_CONFIG_HOME/baud on Linux/macOS, falls back to ~/.config/baud
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("baud"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("baud"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| Self::from_json(&s))
            .unwrap_or_default()
    }

    fn from_json(s: &str) -> Option<Self> {
        match serde_json::from_str(s) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Ignoring invalid settings file: {}", e);
                None
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::settings_path().context("could not determine settings path")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(path)
    }

    /// Polling interval for watch mode
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Scanner configuration derived from these settings
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            skip_patterns: self.skip_patterns.clone(),
        }
    }
}

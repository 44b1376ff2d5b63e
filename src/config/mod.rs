//! Configuration management for Pepega
//!
//! Settings are read from an optional TOML file. Every section and field
//! falls back to its default, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Largest width or height accepted for the initial window size
pub const MAX_DIMENSION: u32 = 16_384;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PepegaConfig {
    /// Initial window geometry
    #[serde(default)]
    pub window: WindowConfig,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Window settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Width used until the compositor suggests one (pixels)
    pub width: u32,

    /// Height used until the compositor suggests one (pixels)
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl PepegaConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = expand_home(path.as_ref())?;

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PepegaConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("width", self.window.width), ("height", self.window.height)] {
            if value == 0 || value > MAX_DIMENSION {
                anyhow::bail!(
                    "Invalid window {}: {} (must be between 1 and {})",
                    name,
                    value,
                    MAX_DIMENSION
                );
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}

/// Expand a leading `~` to `$HOME`
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}


#[cfg(test)]
mod property_tests;

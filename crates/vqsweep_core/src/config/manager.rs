//! Config manager for loading and saving settings.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - `load_or_create` seeds a default file on first run

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::settings::Settings;

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration on disk.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Load settings from disk; the file must exist.
    pub fn load(&mut self) -> ConfigResult<&Settings> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        let text = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&text)?;
        Ok(&self.settings)
    }

    /// Load settings, writing a default file first if none exists.
    pub fn load_or_create(&mut self) -> ConfigResult<&Settings> {
        if !self.config_path.exists() {
            self.settings = Settings::default();
            self.save()?;
            return Ok(&self.settings);
        }
        self.load()
    }

    /// Write the in-memory settings atomically (temp file, then rename).
    pub fn save(&self) -> ConfigResult<()> {
        let text = toml::to_string_pretty(&self.settings)?;
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(text.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.config_path)?;
        Ok(())
    }

    /// Access the settings currently in memory.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the in-memory settings (call `save()` to persist).
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Path of the underlying config file.
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

//! Configuration: TOML settings plus a small on-disk manager.

pub mod manager;
pub mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{LoggingSettings, Settings, SweepSettings, ToolSettings};

//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field carries a serde default so a partial file loads cleanly.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// External tool locations and limits.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Sweep scheduling and layout.
    #[serde(default)]
    pub sweep: SweepSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Locations of the external ffmpeg toolchain plus the process timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Path or name of the ffmpeg executable.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Path or name of the ffprobe executable.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Wall-clock timeout for any single external process, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional VMAF model path passed to the libvmaf filter.
    #[serde(default)]
    pub vmaf_model_path: Option<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout_secs(),
            vmaf_model_path: None,
        }
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_timeout_secs() -> u64 {
    3600
}

/// Sweep scheduling and output layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Number of sweep units processed at once. 1 means serial.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Subdirectory of the output dir holding metric logs and reports.
    #[serde(default = "default_analysis_subdir")]
    pub analysis_subdir: String,

    /// Default pixel format assumed for raw sources.
    #[serde(default = "default_pix_fmt")]
    pub raw_pix_fmt: String,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            analysis_subdir: default_analysis_subdir(),
            raw_pix_fmt: default_pix_fmt(),
        }
    }
}

fn default_parallelism() -> usize {
    1
}

fn default_analysis_subdir() -> String {
    "metrics_analysis".to_string()
}

fn default_pix_fmt() -> String {
    "yuv420p".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.tools.ffmpeg_path, "ffmpeg");
        assert_eq!(settings.tools.timeout_secs, 3600);
        assert_eq!(settings.sweep.parallelism, 1);
        assert_eq!(settings.sweep.analysis_subdir, "metrics_analysis");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let text = r#"
[tools]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

[sweep]
parallelism = 4
"#;
        let settings: Settings = toml::from_str(text).unwrap();
        assert_eq!(settings.tools.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(settings.tools.ffprobe_path, "ffprobe");
        assert_eq!(settings.sweep.parallelism, 4);
        assert_eq!(settings.sweep.raw_pix_fmt, "yuv420p");
    }
}

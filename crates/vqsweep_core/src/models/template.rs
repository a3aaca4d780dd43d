//! Sweep template: which encoder, which parameters, which control values.
//!
//! Templates are TOML documents owned by whoever drives the pipeline; the
//! core treats them as read-only input. Validation happens once at load so
//! the orchestrator never has to re-check field combinations mid-sweep.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a sweep template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse template: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid template '{name}': {message}")]
    Invalid { name: String, message: String },
}

impl TemplateError {
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// The closed set of supported encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// The ffmpeg binary itself (`-c:v ...` chosen via the parameter string).
    Ffmpeg,
    /// Standalone x264 CLI.
    X264,
    /// Standalone x265 CLI.
    X265,
    /// Fraunhofer vvencapp CLI.
    Vvenc,
}

impl EncoderKind {
    /// Codec selector passed on the command line for non-ffmpeg encoders.
    pub fn codec_name(&self) -> &'static str {
        match self {
            EncoderKind::Ffmpeg => "ffmpeg",
            EncoderKind::X264 => "x264",
            EncoderKind::X265 => "x265",
            EncoderKind::Vvenc => "vvenc",
        }
    }

    /// Extension of the elementary stream this encoder emits.
    pub fn codec_extension(&self) -> &'static str {
        match self {
            EncoderKind::Ffmpeg | EncoderKind::X264 => "h264",
            EncoderKind::X265 => "h265",
            EncoderKind::Vvenc => "h266",
        }
    }

    pub fn is_ffmpeg(&self) -> bool {
        matches!(self, EncoderKind::Ffmpeg)
    }
}

impl std::fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EncoderKind::Ffmpeg => "ffmpeg",
            EncoderKind::X264 => "x264",
            EncoderKind::X265 => "x265",
            EncoderKind::Vvenc => "vvenc",
        };
        f.write_str(name)
    }
}

/// Constant-quality vs average-bitrate sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControl {
    Crf,
    Abr,
}

impl RateControl {
    /// Token used in output file names (`{stem}_{token}_{value}`).
    pub fn token(&self) -> &'static str {
        match self {
            RateControl::Crf => "crf",
            RateControl::Abr => "abr",
        }
    }
}

impl std::fmt::Display for RateControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// The metric families the external tool can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Psnr,
    Ssim,
    Vmaf,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Psnr => "psnr",
            MetricKind::Ssim => "ssim",
            MetricKind::Vmaf => "vmaf",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sweep definition: sources, encoder, control values, metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepTemplate {
    /// Human-readable template name, used in reports and errors.
    pub name: String,

    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,

    /// Source path expression: file, comma list, directory, or glob.
    pub source_path: String,

    /// Directory for encoded artifacts and metric logs.
    pub output_dir: PathBuf,

    /// Which encoder to drive.
    pub encoder: EncoderKind,

    /// Explicit executable path; falls back to the encoder's default binary.
    #[serde(default)]
    pub encoder_path: Option<PathBuf>,

    /// Free-form advisory parameter string, e.g. "-c:v libx264 -preset slow".
    #[serde(default)]
    pub encoder_params: String,

    /// Constant-quality or average-bitrate sweep.
    pub rate_control: RateControl,

    /// Ordered control values (CRF values, or kbit/s targets for abr).
    pub control_values: Vec<f64>,

    /// Metric families to compute per unit.
    #[serde(default)]
    pub metrics: Vec<MetricKind>,

    /// Reuse pre-encoded artifacts instead of encoding.
    #[serde(default)]
    pub skip_encode: bool,

    /// Encode only; no metric invocations.
    #[serde(default)]
    pub skip_metrics: bool,
}

impl SweepTemplate {
    /// Load a template from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = fs::read_to_string(path)?;
        let template: SweepTemplate = toml::from_str(&text)?;
        template.validate()?;
        Ok(template)
    }

    /// Check field combinations that serde alone cannot express.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::invalid("<unnamed>", "name must not be empty"));
        }
        if self.source_path.trim().is_empty() {
            return Err(TemplateError::invalid(&self.name, "source_path must not be empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(TemplateError::invalid(&self.name, "output_dir must not be empty"));
        }
        if self.control_values.is_empty() {
            return Err(TemplateError::invalid(
                &self.name,
                "at least one control value is required",
            ));
        }
        if !self.control_values.iter().all(|v| v.is_finite()) {
            return Err(TemplateError::invalid(
                &self.name,
                "control values must be finite numbers",
            ));
        }
        // ffmpeg with no codec selection would re-mux instead of encode.
        if !self.skip_encode && self.encoder.is_ffmpeg() && self.encoder_params.trim().is_empty() {
            return Err(TemplateError::invalid(
                &self.name,
                "encoder_params must select a codec when the encoder is ffmpeg",
            ));
        }
        if self.skip_encode && self.skip_metrics {
            return Err(TemplateError::invalid(
                &self.name,
                "skip_encode and skip_metrics together leave nothing to do",
            ));
        }
        if !self.skip_metrics && self.metrics.is_empty() {
            return Err(TemplateError::invalid(
                &self.name,
                "at least one metric is required unless skip_metrics is set",
            ));
        }
        Ok(())
    }

    /// Executable to invoke for encodes. All encoder kinds default to the
    /// configured ffmpeg binary; an explicit path overrides it.
    pub fn encoder_binary(&self, ffmpeg_path: &str) -> String {
        match &self.encoder_path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => ffmpeg_path.to_string(),
        }
    }

    /// Control values in ascending order, for deterministic sweep layout.
    pub fn sorted_control_values(&self) -> Vec<f64> {
        let mut values = self.control_values.clone();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_template() -> SweepTemplate {
        SweepTemplate {
            name: "x264-fast".to_string(),
            description: None,
            source_path: "/data/sources".to_string(),
            output_dir: PathBuf::from("/data/out"),
            encoder: EncoderKind::Ffmpeg,
            encoder_path: None,
            encoder_params: "-c:v libx264 -preset fast".to_string(),
            rate_control: RateControl::Crf,
            control_values: vec![23.0, 27.0, 31.0, 35.0],
            metrics: vec![MetricKind::Psnr, MetricKind::Vmaf],
            skip_encode: false,
            skip_metrics: false,
        }
    }

    #[test]
    fn valid_template_passes() {
        assert!(base_template().validate().is_ok());
    }

    #[test]
    fn empty_control_values_rejected() {
        let mut t = base_template();
        t.control_values.clear();
        assert!(matches!(t.validate(), Err(TemplateError::Invalid { .. })));
    }

    #[test]
    fn metrics_required_unless_skipped() {
        let mut t = base_template();
        t.metrics.clear();
        assert!(t.validate().is_err());
        t.skip_metrics = true;
        assert!(t.validate().is_ok());
    }

    #[test]
    fn skip_both_rejected() {
        let mut t = base_template();
        t.skip_encode = true;
        t.skip_metrics = true;
        assert!(t.validate().is_err());
    }

    #[test]
    fn sorted_values_dedup_ascending() {
        let mut t = base_template();
        t.control_values = vec![31.0, 23.0, 27.0, 23.0];
        assert_eq!(t.sorted_control_values(), vec![23.0, 27.0, 31.0]);
    }

    #[test]
    fn load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name = "hevc-sweep"
source_path = "/data/clip_640x360_30.yuv"
output_dir = "/data/out"
encoder = "x265"
encoder_params = "--preset medium"
rate_control = "crf"
control_values = [22.0, 26.0, 30.0, 34.0]
metrics = ["psnr", "ssim", "vmaf"]
"#
        )
        .unwrap();
        let template = SweepTemplate::load(file.path()).unwrap();
        assert_eq!(template.encoder, EncoderKind::X265);
        assert_eq!(template.encoder.codec_extension(), "h265");
        assert_eq!(template.rate_control, RateControl::Crf);
        assert_eq!(template.metrics.len(), 3);
        assert!(!template.skip_encode);
    }
}

//! Report documents handed to the persistence/presentation collaborator.
//!
//! Two documents are written per run: `analyse_data.json` with the full
//! sweep entries, errors, command log, and environment snapshot; and,
//! when two variants are compared, `report_data.json` with the BD table.
//! Both are opaque to the core once written.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::bd::{BdResult, CurveFit, RatePoint};
use crate::models::{CommandLogEntry, RateControl, SweepTemplate};
use crate::sweep::{SweepOutcome, UnitFailure, UnitResult};

/// File name of the per-sweep document, inside the analysis directory.
pub const ANALYSE_DATA_FILE: &str = "analyse_data.json";

/// File name of the anchor/test comparison document.
pub const REPORT_DATA_FILE: &str = "report_data.json";

/// Errors raised while persisting report documents.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host snapshot embedded in every document for later re-rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    pub logical_cores: usize,
    pub captured_at: DateTime<Local>,
}

impl EnvironmentInfo {
    pub fn capture() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            logical_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            captured_at: Local::now(),
        }
    }
}

/// The full record of one sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDocument {
    /// Document discriminator for downstream renderers.
    pub kind: String,
    pub template: String,
    pub rate_control: RateControl,
    pub control_values: Vec<f64>,
    pub generated_at: DateTime<Local>,
    pub environment: EnvironmentInfo,
    pub entries: Vec<UnitResult>,
    pub errors: Vec<UnitFailure>,
    pub command_log: Vec<CommandLogEntry>,
}

impl AnalysisDocument {
    pub fn new(
        template: &SweepTemplate,
        outcome: &SweepOutcome,
        command_log: Vec<CommandLogEntry>,
    ) -> Self {
        Self {
            kind: "metrics_sweep".to_string(),
            template: template.name.clone(),
            rate_control: template.rate_control,
            control_values: template.sorted_control_values(),
            generated_at: Local::now(),
            environment: EnvironmentInfo::capture(),
            entries: outcome.successful.clone(),
            errors: outcome.failed.clone(),
            command_log,
        }
    }
}

/// The anchor/test BD comparison record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonDocument {
    pub kind: String,
    pub anchor: String,
    pub test: String,
    pub fit: CurveFit,
    pub generated_at: DateTime<Local>,
    pub environment: EnvironmentInfo,
    pub bd: Vec<BdResult>,
    pub anchor_points: Vec<RatePoint>,
    pub test_points: Vec<RatePoint>,
}

impl ComparisonDocument {
    pub fn new(
        anchor_name: impl Into<String>,
        test_name: impl Into<String>,
        fit: CurveFit,
        bd: Vec<BdResult>,
        anchor_points: Vec<RatePoint>,
        test_points: Vec<RatePoint>,
    ) -> Self {
        Self {
            kind: "metrics_comparison".to_string(),
            anchor: anchor_name.into(),
            test: test_name.into(),
            fit,
            generated_at: Local::now(),
            environment: EnvironmentInfo::capture(),
            bd,
            anchor_points,
            test_points,
        }
    }
}

/// Serialize `value` to `path` atomically (temp file, then rename).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let io_err = |source: std::io::Error| ReportError::Io {
        path: path.display().to_string(),
        source,
    };
    let text = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(text.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)?;
    info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EncoderKind, MetricKind};
    use std::path::PathBuf;

    fn sample_template() -> SweepTemplate {
        SweepTemplate {
            name: "report-test".to_string(),
            description: None,
            source_path: "/data".to_string(),
            output_dir: PathBuf::from("/out"),
            encoder: EncoderKind::Ffmpeg,
            encoder_path: None,
            encoder_params: "-c:v libx264".to_string(),
            rate_control: RateControl::Crf,
            control_values: vec![31.0, 23.0],
            metrics: vec![MetricKind::Psnr],
            skip_encode: false,
            skip_metrics: false,
        }
    }

    #[test]
    fn environment_snapshot_is_populated() {
        let env = EnvironmentInfo::capture();
        assert!(!env.os.is_empty());
        assert!(env.logical_cores >= 1);
    }

    #[test]
    fn analysis_document_sorts_control_values() {
        let doc = AnalysisDocument::new(&sample_template(), &SweepOutcome::default(), Vec::new());
        assert_eq!(doc.kind, "metrics_sweep");
        assert_eq!(doc.control_values, vec![23.0, 31.0]);
    }

    #[test]
    fn write_json_is_atomic_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join(ANALYSE_DATA_FILE);
        let doc = AnalysisDocument::new(&sample_template(), &SweepOutcome::default(), Vec::new());
        write_json(&path, &doc).unwrap();
        assert!(path.is_file());
        assert!(!path.with_extension("json.tmp").exists());

        let text = fs::read_to_string(&path).unwrap();
        let parsed: AnalysisDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.template, "report-test");
        assert!(parsed.entries.is_empty());
    }
}

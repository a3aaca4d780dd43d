//! Result types for one sweep run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bd::RatePoint;
use crate::metrics::{PlaneReport, VmafReport};
use crate::models::{EncodedArtifact, SourceDescriptor};

/// Lifecycle of one (source, control value) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Encoding,
    Measuring,
    Done,
    Failed,
}

/// One (source, control value) work item, laid out before execution.
#[derive(Debug, Clone)]
pub struct SweepUnit {
    pub source: SourceDescriptor,
    pub control_value: f64,
    /// `{source-stem}_{rate-control}_{value}` naming stem.
    pub stem: String,
    /// Expected encoded output path.
    pub output_path: PathBuf,
    /// Directory for this unit's metric logs.
    pub analysis_dir: PathBuf,
}

/// A completed unit: the artifact plus whatever metrics were requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResult {
    /// Source file name.
    pub source: String,
    pub control_value: f64,
    pub artifact: EncodedArtifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psnr: Option<PlaneReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssim: Option<PlaneReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmaf: Option<VmafReport>,
}

impl UnitResult {
    /// Join artifact and metric summaries into the unit consumed by BD
    /// aggregation. `None` when the artifact's bitrate is unknown.
    pub fn rate_point(&self) -> Option<RatePoint> {
        let bitrate_bps = self.artifact.bitrate_bps?;
        Some(RatePoint {
            video: self.source.clone(),
            control_value: self.control_value,
            bitrate_bps,
            psnr: self.psnr.as_ref().map(|r| r.summary.avg),
            ssim: self.ssim.as_ref().map(|r| r.summary.avg),
            vmaf: self.vmaf.as_ref().and_then(|r| r.summary.vmaf_mean),
            vmaf_neg: self.vmaf.as_ref().and_then(|r| r.summary.vmaf_neg_mean),
        })
    }
}

/// A failed unit with the step it failed at and the captured detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFailure {
    pub source: String,
    pub control_value: f64,
    /// `Encoding` or `Measuring`.
    pub stage: UnitState,
    pub message: String,
}

/// The final result of one sweep: successes and failures side by side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub successful: Vec<UnitResult>,
    pub failed: Vec<UnitFailure>,
}

impl SweepOutcome {
    /// Rate points for every successful unit with a known bitrate.
    pub fn rate_points(&self) -> Vec<RatePoint> {
        self.successful
            .iter()
            .filter_map(UnitResult::rate_point)
            .collect()
    }
}

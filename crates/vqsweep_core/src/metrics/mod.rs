//! Parsers for the external tool's metric output.
//!
//! One module per metric family. Each parser returns `{summary, frames}`
//! and treats "no recognizable data" as a hard error, never a zero
//! result. Parsers only read what the tool wrote; they never resample or
//! align frames between streams.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod psnr;
pub mod ssim;
pub mod vmaf;

pub use psnr::{parse_psnr_log, parse_psnr_text};
pub use ssim::{parse_ssim_log, parse_ssim_text};
pub use vmaf::{
    detect_vmaf_format, parse_vmaf_log, parse_vmaf_text, FeatureStats, VmafFormat, VmafReport,
    VmafSummary,
};

/// Errors raised while parsing metric logs.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read metric log '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("No {metric} data found in '{path}'")]
    NoData { metric: &'static str, path: String },

    #[error("Unrecognized {metric} document '{path}': {message}")]
    Format {
        metric: &'static str,
        path: String,
        message: String,
    },
}

impl ParseError {
    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn no_data(metric: &'static str, path: &str) -> Self {
        Self::NoData {
            metric,
            path: path.to_string(),
        }
    }
}

/// Per-plane scalar summary shared by PSNR and SSIM (arithmetic mean of
/// the per-frame values).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSummary {
    pub avg: f64,
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

/// Per-plane frame series shared by PSNR and SSIM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaneFrames {
    pub avg: Vec<f64>,
    pub y: Vec<f64>,
    pub u: Vec<f64>,
    pub v: Vec<f64>,
}

/// `{summary, frames}` result for the plane-keyed metric families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneReport {
    pub summary: PlaneSummary,
    pub frames: PlaneFrames,
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Harmonic mean over the strictly positive values; `None` when there
/// are none.
pub(crate) fn harmonic_mean(values: &[f64]) -> Option<f64> {
    let positives: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
    if positives.is_empty() {
        None
    } else {
        Some(positives.len() as f64 / positives.iter().map(|v| 1.0 / v).sum::<f64>())
    }
}

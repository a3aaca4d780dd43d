//! VMAF output parsing.
//!
//! libvmaf writes either a JSON document (`frames[]` + `pooled_metrics`)
//! or a CSV with one row per frame, depending on `log_fmt`. The format is
//! detected from the first non-whitespace byte and parsed as a tagged
//! variant. Frame series are keyed by whatever metric names the tool
//! emitted; the key set varies by libvmaf build.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{harmonic_mean, mean, ParseError};

/// The two on-disk encodings libvmaf produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmafFormat {
    Json,
    Csv,
}

/// Sniff the document format from the first non-whitespace character.
pub fn detect_vmaf_format(text: &str) -> Option<VmafFormat> {
    let first = text.trim_start().chars().next()?;
    if first == '{' {
        Some(VmafFormat::Json)
    } else {
        Some(VmafFormat::Csv)
    }
}

/// Pooled scalar summary for vmaf and, when the build provides it,
/// vmaf_neg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VmafSummary {
    pub vmaf_mean: Option<f64>,
    pub vmaf_harmonic_mean: Option<f64>,
    pub vmaf_neg_mean: Option<f64>,
    pub vmaf_neg_harmonic_mean: Option<f64>,
}

/// Pooled `{mean, harmonic_mean}` for one metric key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harmonic_mean: Option<f64>,
}

/// `{summary, frames, feature_summary}` result of one VMAF run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmafReport {
    pub summary: VmafSummary,
    /// Per-frame series per discovered metric key; gaps stay `None`.
    pub frames: BTreeMap<String, Vec<Option<f64>>>,
    /// Pooled stats per discovered metric key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_summary: BTreeMap<String, FeatureStats>,
}

#[derive(Deserialize)]
struct JsonDocument {
    #[serde(default)]
    frames: Vec<JsonFrame>,
    #[serde(default)]
    pooled_metrics: BTreeMap<String, JsonPooled>,
}

#[derive(Deserialize)]
struct JsonFrame {
    #[serde(default)]
    metrics: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct JsonPooled {
    mean: Option<f64>,
    harmonic_mean: Option<f64>,
}

/// Parse a VMAF log file from disk.
pub fn parse_vmaf_log(path: &Path) -> Result<VmafReport, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::read(path, source))?;
    parse_vmaf_text(&text, &path.display().to_string())
}

/// Parse VMAF output text. `name` is used in error messages only.
pub fn parse_vmaf_text(text: &str, name: &str) -> Result<VmafReport, ParseError> {
    match detect_vmaf_format(text) {
        None => Err(ParseError::no_data("VMAF", name)),
        Some(VmafFormat::Json) => parse_json(text, name),
        Some(VmafFormat::Csv) => parse_csv(text, name),
    }
}

fn parse_json(text: &str, name: &str) -> Result<VmafReport, ParseError> {
    let doc: JsonDocument = serde_json::from_str(text).map_err(|e| ParseError::Format {
        metric: "VMAF",
        path: name.to_string(),
        message: e.to_string(),
    })?;

    let mut keys: Vec<&String> = doc
        .frames
        .iter()
        .flat_map(|f| f.metrics.keys())
        .collect();
    keys.sort();
    keys.dedup();

    let mut frames: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for key in &keys {
        let series: Vec<Option<f64>> = doc
            .frames
            .iter()
            .map(|frame| frame.metrics.get(*key).and_then(value_as_f64))
            .collect();
        if series.iter().any(Option::is_some) {
            frames.insert((*key).clone(), series);
        }
    }

    let mut feature_summary = BTreeMap::new();
    for (key, pooled) in &doc.pooled_metrics {
        if pooled.mean.is_some() || pooled.harmonic_mean.is_some() {
            feature_summary.insert(
                key.clone(),
                FeatureStats {
                    mean: pooled.mean,
                    harmonic_mean: pooled.harmonic_mean,
                },
            );
        }
    }

    let summary = VmafSummary {
        vmaf_mean: doc.pooled_metrics.get("vmaf").and_then(|p| p.mean),
        vmaf_harmonic_mean: doc.pooled_metrics.get("vmaf").and_then(|p| p.harmonic_mean),
        vmaf_neg_mean: doc.pooled_metrics.get("vmaf_neg").and_then(|p| p.mean),
        vmaf_neg_harmonic_mean: doc
            .pooled_metrics
            .get("vmaf_neg")
            .and_then(|p| p.harmonic_mean),
    };

    if frames.is_empty() && summary == VmafSummary::default() {
        return Err(ParseError::no_data("VMAF", name));
    }

    Ok(VmafReport {
        summary,
        frames,
        feature_summary,
    })
}

fn parse_csv(text: &str, name: &str) -> Result<VmafReport, ParseError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| ParseError::no_data("VMAF", name))?;

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let keep: Vec<(usize, String)> = columns
        .iter()
        .enumerate()
        .filter(|(_, col)| {
            !col.is_empty() && !matches!(col.to_lowercase().as_str(), "frame" | "index" | "frame_num")
        })
        .map(|(i, col)| (i, col.to_string()))
        .collect();

    let mut frames: BTreeMap<String, Vec<Option<f64>>> = keep
        .iter()
        .map(|(_, key)| (key.clone(), Vec::new()))
        .collect();
    for line in lines {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        for (index, key) in &keep {
            let value = fields.get(*index).and_then(|f| f.parse::<f64>().ok());
            if let Some(series) = frames.get_mut(key) {
                series.push(value);
            }
        }
    }
    frames.retain(|_, series| series.iter().any(Option::is_some));

    if frames.is_empty() {
        return Err(ParseError::no_data("VMAF", name));
    }

    let mut feature_summary = BTreeMap::new();
    for (key, series) in &frames {
        let values: Vec<f64> = series.iter().flatten().copied().collect();
        if values.is_empty() {
            continue;
        }
        feature_summary.insert(
            key.clone(),
            FeatureStats {
                mean: Some(mean(&values)),
                harmonic_mean: harmonic_mean(&values),
            },
        );
    }

    let pooled = |key: &str| feature_summary.get(key).copied().unwrap_or_default();
    let summary = VmafSummary {
        vmaf_mean: pooled("vmaf").mean,
        vmaf_harmonic_mean: pooled("vmaf").harmonic_mean,
        vmaf_neg_mean: pooled("vmaf_neg").mean,
        vmaf_neg_harmonic_mean: pooled("vmaf_neg").harmonic_mean,
    };

    Ok(VmafReport {
        summary,
        frames,
        feature_summary,
    })
}

fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

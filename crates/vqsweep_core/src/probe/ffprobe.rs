//! ffprobe JSON probing.
//!
//! Two queries are used: `-show_format -show_streams` for stream geometry
//! and `-show_frames` for the per-frame packet series of an encoded
//! artifact. Both go through the shared `ProcessRunner`, so tests can
//! script probe answers without an ffprobe binary.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{CommandKind, FramePacket};
use crate::process::{run_logged, CommandLog, ProcessError, ProcessRunner, RunRequest};

/// Errors raised while probing a media file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Run(#[from] ProcessError),

    #[error("ffprobe produced unparsable JSON for '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No video stream found in '{path}'")]
    NoVideoStream { path: String },

    #[error("Probe of '{path}' is missing required field '{field}'")]
    MissingField { path: String, field: &'static str },
}

/// Stream geometry and format-level figures for one media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub duration_secs: Option<f64>,
    pub bit_rate_bps: Option<f64>,
    pub codec_name: Option<String>,
    pub pix_fmt: Option<String>,
}

/// Probe seam, implemented by `FfprobeTool` and by test doubles.
pub trait MediaProber: Send + Sync {
    fn media_info(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
    fn frame_packets(&self, path: &Path) -> Result<Vec<FramePacket>, ProbeError>;
}

/// Drives the real ffprobe binary.
pub struct FfprobeTool {
    ffprobe: String,
    runner: Arc<dyn ProcessRunner>,
    /// When set, probe invocations are recorded in the command log.
    log: Option<CommandLog>,
}

impl FfprobeTool {
    pub fn new(ffprobe: impl Into<String>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            runner,
            log: None,
        }
    }

    /// Record probe invocations in `log` (used for artifact probes inside
    /// sweep units; resolver probes stay unlogged).
    pub fn with_log(mut self, log: CommandLog) -> Self {
        self.log = Some(log);
        self
    }

    fn run(&self, args: Vec<String>, path: &Path) -> Result<Vec<u8>, ProbeError> {
        let request = RunRequest {
            program: self.ffprobe.clone(),
            args,
            kind: CommandKind::Probe,
            source_file: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            expected_output: None,
        };
        let output = match &self.log {
            Some(log) => run_logged(self.runner.as_ref(), log, &request)?,
            None => self.runner.run(&request)?,
        };
        Ok(output.stdout)
    }
}

impl MediaProber for FfprobeTool {
    fn media_info(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let stdout = self.run(args, path)?;
        let info = parse_media_info(&stdout, path)?;
        debug!(path = %path.display(), width = info.width, height = info.height, "probed");
        Ok(info)
    }

    fn frame_packets(&self, path: &Path) -> Result<Vec<FramePacket>, ProbeError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_frames".to_string(),
            "-show_entries".to_string(),
            "frame=pict_type,pkt_size,best_effort_timestamp_time".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let stdout = self.run(args, path)?;
        parse_frame_packets(&stdout, path)
    }
}

/// Parse a `-show_format -show_streams` document.
pub fn parse_media_info(bytes: &[u8], path: &Path) -> Result<MediaInfo, ProbeError> {
    let path_str = path.display().to_string();
    let doc: Value = serde_json::from_slice(bytes).map_err(|source| ProbeError::Json {
        path: path_str.clone(),
        source,
    })?;

    let streams = doc
        .get("streams")
        .and_then(Value::as_array)
        .ok_or_else(|| ProbeError::NoVideoStream {
            path: path_str.clone(),
        })?;
    let video = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(Value::as_str) == Some("video"))
        .ok_or_else(|| ProbeError::NoVideoStream {
            path: path_str.clone(),
        })?;

    let width = video
        .get("width")
        .and_then(Value::as_u64)
        .ok_or(ProbeError::MissingField {
            path: path_str.clone(),
            field: "width",
        })? as u32;
    let height = video
        .get("height")
        .and_then(Value::as_u64)
        .ok_or(ProbeError::MissingField {
            path: path_str.clone(),
            field: "height",
        })? as u32;

    let fps = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| video.get(*key).and_then(Value::as_str))
        .find_map(parse_rational);

    let format = doc.get("format");
    let duration_secs = format
        .and_then(|f| f.get("duration"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<f64>().ok());
    let bit_rate_bps = format
        .and_then(|f| f.get("bit_rate"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<f64>().ok());

    Ok(MediaInfo {
        width,
        height,
        fps,
        duration_secs,
        bit_rate_bps,
        codec_name: video
            .get("codec_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        pix_fmt: video
            .get("pix_fmt")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Parse a `-show_frames` document into the packet series.
pub fn parse_frame_packets(bytes: &[u8], path: &Path) -> Result<Vec<FramePacket>, ProbeError> {
    let doc: Value = serde_json::from_slice(bytes).map_err(|source| ProbeError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let frames = match doc.get("frames").and_then(Value::as_array) {
        Some(frames) => frames,
        None => return Ok(Vec::new()),
    };
    let packets = frames
        .iter()
        .enumerate()
        .map(|(index, frame)| FramePacket {
            index,
            pict_type: frame
                .get("pict_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            size_bytes: frame
                .get("pkt_size")
                .and_then(|v| match v {
                    Value::String(s) => s.parse::<u64>().ok(),
                    other => other.as_u64(),
                })
                .unwrap_or(0),
            timestamp: frame
                .get("best_effort_timestamp_time")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<f64>().ok()),
        })
        .collect();
    Ok(packets)
}

/// Parse ffprobe's "num/den" rational rate strings.
fn parse_rational(text: &str) -> Option<f64> {
    if let Some((num, den)) = text.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 || num <= 0.0 {
            return None;
        }
        Some(num / den)
    } else {
        text.trim().parse::<f64>().ok().filter(|v| *v > 0.0)
    }
}

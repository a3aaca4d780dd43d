//! SSIM stats_file parsing.
//!
//! Line format written by the ssim filter:
//! `n:1 Y:0.9876 U:0.9901 V:0.9888 All:0.9885 (15.234)`
//!
//! `All` is the anchor key; a line without it contributes nothing.

use std::fs;
use std::path::Path;

use super::{mean, ParseError, PlaneFrames, PlaneReport, PlaneSummary};

/// Parse an SSIM log file from disk.
pub fn parse_ssim_log(path: &Path) -> Result<PlaneReport, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::read(path, source))?;
    parse_ssim_text(&text, &path.display().to_string())
}

/// Parse SSIM log text. `name` is used in error messages only.
pub fn parse_ssim_text(text: &str, name: &str) -> Result<PlaneReport, ParseError> {
    let mut frames = PlaneFrames::default();

    for line in text.lines() {
        if !line.contains("All:") {
            continue;
        }
        let mut all = None;
        let mut y = None;
        let mut u = None;
        let mut v = None;
        for part in line.split_whitespace() {
            let Some((key, val)) = part.split_once(':') else {
                continue;
            };
            let Ok(parsed) = val.parse::<f64>() else {
                continue;
            };
            match key.trim() {
                "All" => all = Some(parsed),
                "Y" => y = Some(parsed),
                "U" => u = Some(parsed),
                "V" => v = Some(parsed),
                _ => {}
            }
        }
        if let Some(all) = all {
            frames.avg.push(all);
            frames.y.push(y.unwrap_or(0.0));
            frames.u.push(u.unwrap_or(0.0));
            frames.v.push(v.unwrap_or(0.0));
        }
    }

    if frames.avg.is_empty() {
        return Err(ParseError::no_data("SSIM", name));
    }

    Ok(PlaneReport {
        summary: PlaneSummary {
            avg: mean(&frames.avg),
            y: mean(&frames.y),
            u: mean(&frames.u),
            v: mean(&frames.v),
        },
        frames,
    })
}

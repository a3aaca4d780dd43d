//! PSNR stats_file parsing.
//!
//! Line format written by the psnr filter:
//! `n:1 mse_avg:0.52 ... psnr_avg:50.99 psnr_y:51.31 psnr_u:50.48 psnr_v:50.97`
//!
//! A line counts as a frame sample iff it carries a parsable `psnr_avg`.

use std::fs;
use std::path::Path;

use super::{mean, ParseError, PlaneFrames, PlaneReport, PlaneSummary};

/// Parse a PSNR log file from disk.
pub fn parse_psnr_log(path: &Path) -> Result<PlaneReport, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::read(path, source))?;
    parse_psnr_text(&text, &path.display().to_string())
}

/// Parse PSNR log text. `name` is used in error messages only.
pub fn parse_psnr_text(text: &str, name: &str) -> Result<PlaneReport, ParseError> {
    let mut frames = PlaneFrames::default();

    for line in text.lines() {
        if !line.contains("psnr_avg") {
            continue;
        }
        let mut avg = None;
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
            match key {
                "psnr_avg" => avg = Some(parsed),
                "psnr_y" => y = Some(parsed),
                "psnr_u" => u = Some(parsed),
                "psnr_v" => v = Some(parsed),
                _ => {}
            }
        }
        if let Some(avg) = avg {
            frames.avg.push(avg);
            frames.y.push(y.unwrap_or(0.0));
            frames.u.push(u.unwrap_or(0.0));
            frames.v.push(v.unwrap_or(0.0));
        }
    }

    if frames.avg.is_empty() {
        return Err(ParseError::no_data("PSNR", name));
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

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
n:1 mse_avg:0.52 mse_y:0.48 psnr_avg:50.0 psnr_y:51.0 psnr_u:49.0 psnr_v:50.5\n\
n:2 mse_avg:0.61 mse_y:0.55 psnr_avg:48.0 psnr_y:49.0 psnr_u:47.0 psnr_v:48.5\n";

    #[test]
    fn summary_is_mean_of_frames() {
        let report = parse_psnr_text(LOG, "test.log").unwrap();
        assert_eq!(report.frames.avg.len(), 2);
        assert!((report.summary.avg - 49.0).abs() < 1e-9);
        assert!((report.summary.y - 50.0).abs() < 1e-9);
        assert!((report.summary.u - 48.0).abs() < 1e-9);
        assert!((report.summary.v - 49.5).abs() < 1e-9);
    }

    #[test]
    fn summary_matches_mean_for_any_frame_count() {
        for n in 1..=7 {
            let mut text = String::new();
            for i in 0..n {
                text.push_str(&format!(
                    "n:{} psnr_avg:{} psnr_y:40.0 psnr_u:40.0 psnr_v:40.0\n",
                    i + 1,
                    30.0 + i as f64
                ));
            }
            let report = parse_psnr_text(&text, "gen.log").unwrap();
            let expected = report.frames.avg.iter().sum::<f64>() / n as f64;
            assert!((report.summary.avg - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn no_matching_lines_is_a_hard_error() {
        let err = parse_psnr_text("frame=1 q=28.0\nnothing here\n", "empty.log").unwrap_err();
        assert!(matches!(err, ParseError::NoData { metric: "PSNR", .. }));
    }

    #[test]
    fn inf_values_are_accepted() {
        let report = parse_psnr_text(
            "n:1 psnr_avg:inf psnr_y:inf psnr_u:inf psnr_v:inf\n",
            "lossless.log",
        )
        .unwrap();
        assert!(report.summary.avg.is_infinite());
    }

    #[test]
    fn lines_without_psnr_avg_are_skipped() {
        let text = "n:1 psnr_y:40.0\nn:2 psnr_avg:35.0 psnr_y:36.0 psnr_u:34.0 psnr_v:35.0\n";
        let report = parse_psnr_text(text, "partial.log").unwrap();
        assert_eq!(report.frames.avg, vec![35.0]);
    }
}

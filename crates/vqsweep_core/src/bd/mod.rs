//! Bjontegaard-Delta aggregation of rate/quality curves.
//!
//! Two variants of the same logical sources are compared per metric
//! family. Rates are log-transformed, both curves are integrated over
//! their overlapping domain, and the average difference becomes BD-Rate
//! (percent rate deviation at equal quality) or BD-Metric (quality delta
//! at equal rate). Anything that cannot be computed honestly is `None`;
//! never a fabricated number.

use serde::{Deserialize, Serialize};

pub mod pchip;
pub mod polyfit;

use pchip::{pchip_interpolate, sort_by_x};
use polyfit::{fit_cubic, integrate_cubic};

/// Sampling resolution of the piecewise integration path.
const PIECEWISE_SAMPLES: usize = 100;

/// Minimum points per side for a meaningful cubic fit.
const MIN_POINTS: usize = 4;

/// The two numerically distinct integration conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveFit {
    /// Cubic polynomial fit with analytic integration.
    Polynomial,
    /// PCHIP interpolation sampled at fixed resolution, trapezoid rule.
    Piecewise,
}

/// Metric families BD comparison is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Psnr,
    Ssim,
    Vmaf,
    VmafNeg,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 4] = [
        MetricFamily::Psnr,
        MetricFamily::Ssim,
        MetricFamily::Vmaf,
        MetricFamily::VmafNeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFamily::Psnr => "psnr",
            MetricFamily::Ssim => "ssim",
            MetricFamily::Vmaf => "vmaf",
            MetricFamily::VmafNeg => "vmaf_neg",
        }
    }
}

/// The atomic unit consumed by BD aggregation: one (source, control
/// value) measurement. Bitrate and every score must come from the same
/// encoded artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatePoint {
    /// Logical source identity (file name).
    pub video: String,
    /// Sweep control value that produced the artifact.
    pub control_value: f64,
    /// Average bitrate of the artifact in bits/second.
    pub bitrate_bps: f64,
    pub psnr: Option<f64>,
    pub ssim: Option<f64>,
    pub vmaf: Option<f64>,
    pub vmaf_neg: Option<f64>,
}

impl RatePoint {
    pub fn score(&self, family: MetricFamily) -> Option<f64> {
        match family {
            MetricFamily::Psnr => self.psnr,
            MetricFamily::Ssim => self.ssim,
            MetricFamily::Vmaf => self.vmaf,
            MetricFamily::VmafNeg => self.vmaf_neg,
        }
    }
}

/// One row of the comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BdResult {
    pub video: String,
    pub metric: MetricFamily,
    /// Percent rate deviation at equal quality; negative favors test.
    pub bd_rate: Option<f64>,
    /// Quality delta at equal rate; positive favors test.
    pub bd_metric: Option<f64>,
}

/// BD-Rate between an anchor and a test curve, as a percentage.
pub fn bd_rate(
    anchor_rates: &[f64],
    anchor_metrics: &[f64],
    test_rates: &[f64],
    test_metrics: &[f64],
    fit: CurveFit,
) -> Option<f64> {
    let (log_anchor, log_test) = log_rates(anchor_rates, test_rates)?;
    check_lengths(anchor_rates, anchor_metrics, test_rates, test_metrics)?;

    // quality on the x axis, log-rate on the y axis
    let (int_anchor, int_test, lo, hi) =
        compute_integrals(anchor_metrics, &log_anchor, test_metrics, &log_test, fit)?;
    let avg_diff = (int_test - int_anchor) / (hi - lo);
    Some((avg_diff.exp() - 1.0) * 100.0)
}

/// BD-Metric between an anchor and a test curve.
pub fn bd_metric(
    anchor_rates: &[f64],
    anchor_metrics: &[f64],
    test_rates: &[f64],
    test_metrics: &[f64],
    fit: CurveFit,
) -> Option<f64> {
    let (log_anchor, log_test) = log_rates(anchor_rates, test_rates)?;
    check_lengths(anchor_rates, anchor_metrics, test_rates, test_metrics)?;

    // log-rate on the x axis, quality on the y axis
    let (int_anchor, int_test, lo, hi) =
        compute_integrals(&log_anchor, anchor_metrics, &log_test, test_metrics, fit)?;
    Some((int_test - int_anchor) / (hi - lo))
}

/// Compare two RatePoint sets per source per metric family.
///
/// A family missing on either side is omitted; a family present but not
/// computable (too few points, empty overlap) yields `None` cells.
pub fn compare_rate_points(
    anchor: &[RatePoint],
    test: &[RatePoint],
    fit: CurveFit,
) -> Vec<BdResult> {
    let mut videos: Vec<&str> = anchor.iter().map(|p| p.video.as_str()).collect();
    videos.sort();
    videos.dedup();

    let mut results = Vec::new();
    for video in videos {
        let anchor_points: Vec<&RatePoint> =
            anchor.iter().filter(|p| p.video == video).collect();
        let test_points: Vec<&RatePoint> = test.iter().filter(|p| p.video == video).collect();
        if test_points.is_empty() {
            continue;
        }

        for family in MetricFamily::ALL {
            let (a_rates, a_scores) = scored_pairs(&anchor_points, family);
            let (t_rates, t_scores) = scored_pairs(&test_points, family);
            if a_scores.is_empty() || t_scores.is_empty() {
                continue;
            }
            results.push(BdResult {
                video: video.to_string(),
                metric: family,
                bd_rate: bd_rate(&a_rates, &a_scores, &t_rates, &t_scores, fit),
                bd_metric: bd_metric(&a_rates, &a_scores, &t_rates, &t_scores, fit),
            });
        }
    }
    results
}

fn scored_pairs(points: &[&RatePoint], family: MetricFamily) -> (Vec<f64>, Vec<f64>) {
    points
        .iter()
        .filter_map(|p| p.score(family).map(|s| (p.bitrate_bps, s)))
        .unzip()
}

fn check_lengths(
    anchor_rates: &[f64],
    anchor_metrics: &[f64],
    test_rates: &[f64],
    test_metrics: &[f64],
) -> Option<()> {
    if anchor_rates.len() == anchor_metrics.len() && test_rates.len() == test_metrics.len() {
        Some(())
    } else {
        None
    }
}

/// Natural-log transform of both rate sets; fewer than the curve-fit
/// minimum or a non-positive rate is not computable.
fn log_rates(anchor_rates: &[f64], test_rates: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
    if anchor_rates.len() < MIN_POINTS || test_rates.len() < MIN_POINTS {
        return None;
    }
    let transform = |rates: &[f64]| -> Option<Vec<f64>> {
        rates
            .iter()
            .map(|&r| (r > 0.0 && r.is_finite()).then(|| r.ln()))
            .collect()
    };
    Some((transform(anchor_rates)?, transform(test_rates)?))
}

/// Integrate both curves over their overlapping x domain.
fn compute_integrals(
    x1: &[f64],
    y1: &[f64],
    x2: &[f64],
    y2: &[f64],
    fit: CurveFit,
) -> Option<(f64, f64, f64, f64)> {
    let lo = f64::max(min_of(x1)?, min_of(x2)?);
    let hi = f64::min(max_of(x1)?, max_of(x2)?);
    if hi <= lo {
        return None;
    }

    match fit {
        CurveFit::Polynomial => {
            let p1 = fit_cubic(x1, y1)?;
            let p2 = fit_cubic(x2, y2)?;
            Some((
                integrate_cubic(&p1, lo, hi),
                integrate_cubic(&p2, lo, hi),
                lo,
                hi,
            ))
        }
        CurveFit::Piecewise => {
            let dx = (hi - lo) / (PIECEWISE_SAMPLES as f64 - 1.0);
            let samples: Vec<f64> = (0..PIECEWISE_SAMPLES).map(|i| lo + dx * i as f64).collect();
            let (sx1, sy1) = sort_by_x(x1, y1);
            let (sx2, sy2) = sort_by_x(x2, y2);
            let v1 = pchip_interpolate(&sx1, &sy1, &samples)?;
            let v2 = pchip_interpolate(&sx2, &sy2, &samples)?;
            Some((trapezoid(&v1, dx), trapezoid(&v2, dx), lo, hi))
        }
    }
}

fn trapezoid(values: &[f64], dx: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let interior: f64 = values[1..values.len() - 1].iter().sum();
    dx * (interior + (values[0] + values[values.len() - 1]) / 2.0)
}

fn min_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

//! Pure metric-command construction.
//!
//! Each metric family is one ffmpeg invocation: the distorted stream is
//! the first input, the reference the second, and a lavfi filter writes
//! the per-frame log to a file. Raw references get explicit rawvideo
//! flags ahead of their input.

use std::path::{Path, PathBuf};

use crate::models::{MetricKind, SourceDescriptor};

/// Metric log file name for one output stem, per the persisted layout:
/// `{stem}_psnr.log`, `{stem}_ssim.log`, `{stem}_vmaf.json`.
pub fn metric_log_name(stem: &str, metric: MetricKind) -> String {
    match metric {
        MetricKind::Psnr => format!("{stem}_psnr.log"),
        MetricKind::Ssim => format!("{stem}_ssim.log"),
        MetricKind::Vmaf => format!("{stem}_vmaf.json"),
    }
}

/// Filter expression for one metric family.
pub fn metric_filter(metric: MetricKind, log_path: &Path, vmaf_model: Option<&str>) -> String {
    let log = log_path.to_string_lossy();
    match metric {
        MetricKind::Psnr => format!("psnr=stats_file={log}"),
        MetricKind::Ssim => format!("ssim=stats_file={log}"),
        MetricKind::Vmaf => match vmaf_model {
            Some(model) => format!("libvmaf=model_path={model}:log_path={log}:log_fmt=json"),
            None => format!("libvmaf=log_path={log}:log_fmt=json"),
        },
    }
}

/// Build the metric argument vector (everything after the ffmpeg binary).
pub fn build_metric_args(
    reference: &SourceDescriptor,
    distorted: &Path,
    filter: &str,
) -> Vec<String> {
    let mut args = vec!["-i".to_string(), distorted.to_string_lossy().into_owned()];

    if reference.is_raw() {
        args.extend([
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            reference.pix_fmt.clone(),
            "-s".to_string(),
            format!("{}x{}", reference.width, reference.height),
            "-r".to_string(),
            format!("{}", reference.fps),
        ]);
    }

    args.extend([
        "-i".to_string(),
        reference.path.to_string_lossy().into_owned(),
        "-lavfi".to_string(),
        filter.to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ]);
    args
}

/// Convenience: args for one metric of one unit.
pub fn build_metric_args_for(
    metric: MetricKind,
    reference: &SourceDescriptor,
    distorted: &Path,
    log_path: &PathBuf,
    vmaf_model: Option<&str>,
) -> Vec<String> {
    let filter = metric_filter(metric, log_path, vmaf_model);
    build_metric_args(reference, distorted, &filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    fn raw_reference() -> SourceDescriptor {
        SourceDescriptor {
            path: PathBuf::from("/data/clip_640x360_30.yuv"),
            kind: SourceKind::Raw,
            width: 640,
            height: 360,
            fps: 30.0,
            pix_fmt: "yuv420p".to_string(),
        }
    }

    #[test]
    fn log_names_follow_layout() {
        assert_eq!(metric_log_name("clip_crf_23", MetricKind::Psnr), "clip_crf_23_psnr.log");
        assert_eq!(metric_log_name("clip_crf_23", MetricKind::Ssim), "clip_crf_23_ssim.log");
        assert_eq!(metric_log_name("clip_crf_23", MetricKind::Vmaf), "clip_crf_23_vmaf.json");
    }

    #[test]
    fn vmaf_filter_with_and_without_model() {
        let log = PathBuf::from("/tmp/a_vmaf.json");
        assert_eq!(
            metric_filter(MetricKind::Vmaf, &log, None),
            "libvmaf=log_path=/tmp/a_vmaf.json:log_fmt=json"
        );
        assert_eq!(
            metric_filter(MetricKind::Vmaf, &log, Some("/models/v061.json")),
            "libvmaf=model_path=/models/v061.json:log_path=/tmp/a_vmaf.json:log_fmt=json"
        );
    }

    #[test]
    fn distorted_is_first_input_reference_second() {
        let args = build_metric_args(
            &raw_reference(),
            Path::new("/out/clip_crf_23.h264"),
            "psnr=stats_file=/tmp/x.log",
        );
        let inputs: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(inputs.len(), 2);
        assert_eq!(args[inputs[0] + 1], "/out/clip_crf_23.h264");
        assert_eq!(args[inputs[1] + 1], "/data/clip_640x360_30.yuv");
        // raw flags sit between the two inputs
        let f_pos = args.iter().position(|a| a == "-f").unwrap();
        assert!(inputs[0] < f_pos && f_pos < inputs[1]);
        assert!(args.ends_with(&["-f".to_string(), "null".to_string(), "-".to_string()]));
    }

    #[test]
    fn container_reference_gets_no_raw_flags() {
        let reference = SourceDescriptor {
            path: PathBuf::from("/data/movie.mp4"),
            kind: SourceKind::Container,
            ..raw_reference()
        };
        let args = build_metric_args(
            &reference,
            Path::new("/out/movie_crf_23.mp4"),
            "ssim=stats_file=/tmp/x.log",
        );
        assert!(!args.contains(&"rawvideo".to_string()));
    }
}

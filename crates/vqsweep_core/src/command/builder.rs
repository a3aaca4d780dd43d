//! Pure encode-command construction.
//!
//! Nothing here touches the filesystem; the same inputs always produce
//! the same argument vector. The free-form parameter string becomes a
//! typed token list, rate-control tokens for the sweep's authority are
//! stripped, and exactly one rate-control flag is appended.

use std::path::{Path, PathBuf};

use crate::models::{EncoderKind, RateControl, SourceDescriptor, SourceKind};

/// One token of a parameter string. A `Flag` starts with `-`; everything
/// else is a `Value` (flag argument or bare positional).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamToken {
    Flag(String),
    Value(String),
}

impl ParamToken {
    pub fn as_str(&self) -> &str {
        match self {
            ParamToken::Flag(s) | ParamToken::Value(s) => s,
        }
    }
}

/// Split a parameter string on whitespace into typed tokens.
pub fn tokenize_params(params: &str) -> Vec<ParamToken> {
    params
        .split_whitespace()
        .map(|tok| {
            if tok.starts_with('-') && tok.len() > 1 {
                ParamToken::Flag(tok.to_string())
            } else {
                ParamToken::Value(tok.to_string())
            }
        })
        .collect()
}

/// Rate-control flags that the sweep owns, per encoder family. Both modes
/// are stripped so the advisory parameters can never conflict with the
/// control value.
fn rate_control_flags(encoder: EncoderKind) -> &'static [&'static str] {
    if encoder.is_ffmpeg() {
        &["-crf", "-b:v"]
    } else {
        &["--crf", "--bitrate"]
    }
}

/// Remove rate-control flags (and the token following each) from a
/// parameter string, returning the surviving tokens as plain strings.
pub fn strip_rate_control(encoder: EncoderKind, params: &str) -> Vec<String> {
    let strip = rate_control_flags(encoder);
    let tokens = tokenize_params(params);
    let mut cleaned = Vec::with_capacity(tokens.len());
    let mut skip_next = false;
    for token in tokens {
        if skip_next {
            skip_next = false;
            continue;
        }
        if matches!(&token, ParamToken::Flag(flag) if strip.contains(&flag.as_str())) {
            skip_next = true;
            continue;
        }
        cleaned.push(token.as_str().to_string());
    }
    cleaned
}

/// The authoritative rate-control flag pair for one control value.
pub fn rate_control_args(encoder: EncoderKind, rc: RateControl, value: f64) -> Vec<String> {
    let value_str = format_control_value(value);
    match (encoder.is_ffmpeg(), rc) {
        (true, RateControl::Crf) => vec!["-crf".to_string(), value_str],
        (true, RateControl::Abr) => vec!["-b:v".to_string(), format!("{value_str}k")],
        (false, RateControl::Crf) => vec!["--crf".to_string(), value_str],
        (false, RateControl::Abr) => vec!["--bitrate".to_string(), value_str],
    }
}

/// Render a control value without a trailing `.0`, so 23.0 becomes "23"
/// and 27.5 stays "27.5".
pub fn format_control_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Output file stem for one (source, control value) unit:
/// `{source-stem}_{rate-control}_{value}`.
pub fn output_stem(source: &SourceDescriptor, rc: RateControl, value: f64) -> String {
    format!("{}_{}_{}", source.stem(), rc.token(), format_control_value(value))
}

/// Output extension, including the leading dot.
///
/// Elementary-stream encoders always emit their codec extension; the
/// ffmpeg path preserves a container source's suffix and maps elementary
/// inputs onto the matching elementary extension.
pub fn output_extension(encoder: EncoderKind, source: &SourceDescriptor) -> String {
    if !encoder.is_ffmpeg() {
        return format!(".{}", encoder.codec_extension());
    }
    match source.kind {
        SourceKind::Container => source
            .extension()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_else(|| ".mp4".to_string()),
        SourceKind::Elementary => match source.extension().as_deref() {
            Some("h265") | Some("265") | Some("hevc") => ".h265".to_string(),
            Some("h266") | Some("266") => ".h266".to_string(),
            _ => ".h264".to_string(),
        },
        SourceKind::Raw => format!(".{}", encoder.codec_extension()),
    }
}

/// Full output path for one unit.
pub fn output_path(
    output_dir: &Path,
    source: &SourceDescriptor,
    encoder: EncoderKind,
    rc: RateControl,
    value: f64,
) -> PathBuf {
    let name = format!(
        "{}{}",
        output_stem(source, rc, value),
        output_extension(encoder, source)
    );
    output_dir.join(name)
}

/// Build the encode argument vector (everything after the program name).
pub fn build_encode_args(
    encoder: EncoderKind,
    params: &str,
    rc: RateControl,
    value: f64,
    source: &SourceDescriptor,
    output: &Path,
) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    let source_path = source.path.to_string_lossy().into_owned();

    if source.is_raw() {
        args.extend([
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            source.pix_fmt.clone(),
            "-s:v".to_string(),
            format!("{}x{}", source.width, source.height),
            "-r".to_string(),
            format!("{}", source.fps),
        ]);
    } else if encoder.is_ffmpeg() && source.kind == SourceKind::Elementary {
        // Headerless streams take the raw-injection path too, minus the
        // rawvideo demuxer flags.
        args.extend([
            "-s:v".to_string(),
            format!("{}x{}", source.width, source.height),
            "-r".to_string(),
            format!("{}", source.fps),
        ]);
    }
    args.extend(["-i".to_string(), source_path]);

    if !encoder.is_ffmpeg() {
        args.extend(["-c:v".to_string(), encoder.codec_name().to_string()]);
    }
    args.extend(strip_rate_control(encoder, params));
    args.extend(rate_control_args(encoder, rc, value));
    args.push(output.to_string_lossy().into_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_source() -> SourceDescriptor {
        SourceDescriptor {
            path: PathBuf::from("/data/clip_640x360_30.yuv"),
            kind: SourceKind::Raw,
            width: 640,
            height: 360,
            fps: 30.0,
            pix_fmt: "yuv420p".to_string(),
        }
    }

    fn container_source() -> SourceDescriptor {
        SourceDescriptor {
            path: PathBuf::from("/data/movie.mkv"),
            kind: SourceKind::Container,
            width: 1920,
            height: 1080,
            fps: 24.0,
            pix_fmt: "yuv420p".to_string(),
        }
    }

    #[test]
    fn control_value_formatting_trims_trailing_zero() {
        assert_eq!(format_control_value(23.0), "23");
        assert_eq!(format_control_value(27.5), "27.5");
        assert_eq!(format_control_value(2000.0), "2000");
    }

    #[test]
    fn output_stem_follows_convention() {
        assert_eq!(
            output_stem(&raw_source(), RateControl::Crf, 23.0),
            "clip_640x360_30_crf_23"
        );
        assert_eq!(
            output_stem(&container_source(), RateControl::Abr, 1500.0),
            "movie_abr_1500"
        );
    }

    #[test]
    fn extension_rules() {
        assert_eq!(output_extension(EncoderKind::X265, &raw_source()), ".h265");
        assert_eq!(output_extension(EncoderKind::Vvenc, &container_source()), ".h266");
        assert_eq!(output_extension(EncoderKind::Ffmpeg, &container_source()), ".mkv");
        assert_eq!(output_extension(EncoderKind::Ffmpeg, &raw_source()), ".h264");

        let elementary = SourceDescriptor {
            path: PathBuf::from("/data/stream.hevc"),
            kind: SourceKind::Elementary,
            ..raw_source()
        };
        assert_eq!(output_extension(EncoderKind::Ffmpeg, &elementary), ".h265");
    }

    #[test]
    fn opposite_mode_tokens_are_stripped() {
        let params = "-c:v libx264 -preset slow -b:v 800k -g 60";
        let args = build_encode_args(
            EncoderKind::Ffmpeg,
            params,
            RateControl::Crf,
            23.0,
            &container_source(),
            Path::new("/out/movie_crf_23.mkv"),
        );
        let crf_count = args.iter().filter(|a| *a == "-crf").count();
        assert_eq!(crf_count, 1);
        assert!(!args.contains(&"-b:v".to_string()));
        assert!(!args.contains(&"800k".to_string()));
        assert!(args.contains(&"-preset".to_string()));
        let crf_pos = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf_pos + 1], "23");
    }

    #[test]
    fn same_mode_token_is_replaced_by_sweep_value() {
        let params = "-c:v libx265 -crf 18";
        let args = build_encode_args(
            EncoderKind::Ffmpeg,
            params,
            RateControl::Crf,
            30.0,
            &container_source(),
            Path::new("/out/movie_crf_30.mkv"),
        );
        let crf_positions: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-crf")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(crf_positions.len(), 1);
        assert_eq!(args[crf_positions[0] + 1], "30");
    }

    #[test]
    fn raw_source_injects_format_flags_before_input() {
        let args = build_encode_args(
            EncoderKind::Ffmpeg,
            "-c:v libx264",
            RateControl::Crf,
            23.0,
            &raw_source(),
            Path::new("/out/clip_640x360_30_crf_23.h264"),
        );
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        let f_pos = args.iter().position(|a| a == "-f").unwrap();
        let s_pos = args.iter().position(|a| a == "-s:v").unwrap();
        assert!(f_pos < i_pos && s_pos < i_pos);
        assert_eq!(args[f_pos + 1], "rawvideo");
        assert_eq!(args[s_pos + 1], "640x360");
    }

    #[test]
    fn container_source_has_no_raw_flags() {
        let args = build_encode_args(
            EncoderKind::Ffmpeg,
            "-c:v libx264",
            RateControl::Abr,
            1500.0,
            &container_source(),
            Path::new("/out/movie_abr_1500.mkv"),
        );
        assert!(!args.contains(&"rawvideo".to_string()));
        assert!(args.contains(&"-b:v".to_string()));
        assert!(args.contains(&"1500k".to_string()));
    }

    #[test]
    fn elementary_encoder_uses_double_dash_flags() {
        let args = build_encode_args(
            EncoderKind::X265,
            "--preset medium --bitrate 900",
            RateControl::Crf,
            27.5,
            &raw_source(),
            Path::new("/out/clip_640x360_30_crf_27.5.h265"),
        );
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"x265".to_string()));
        assert!(!args.contains(&"--bitrate".to_string()));
        assert!(!args.contains(&"900".to_string()));
        let pos = args.iter().position(|a| a == "--crf").unwrap();
        assert_eq!(args[pos + 1], "27.5");
    }

    #[test]
    fn builder_is_deterministic() {
        let a = build_encode_args(
            EncoderKind::Ffmpeg,
            "-c:v libx264 -preset fast",
            RateControl::Crf,
            23.0,
            &raw_source(),
            Path::new("/out/x.h264"),
        );
        let b = build_encode_args(
            EncoderKind::Ffmpeg,
            "-c:v libx264 -preset fast",
            RateControl::Crf,
            23.0,
            &raw_source(),
            Path::new("/out/x.h264"),
        );
        assert_eq!(a, b);
    }
}

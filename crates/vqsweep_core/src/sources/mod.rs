//! Source resolution: path expressions to typed source descriptors.
//!
//! A source expression is a single file, a comma-separated file list, a
//! directory, or a glob. Resolution errors fail the whole request; there
//! is no silent defaulting. The returned list is sorted by file name so
//! sweep layout is deterministic.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::models::media::extension_lowercase;
use crate::models::{SourceDescriptor, SourceKind};
use crate::probe::{MediaProber, ProbeError};

/// Raw planar-sample extensions; these need the filename convention.
const RAW_EXTENSIONS: &[&str] = &["yuv"];

/// Self-describing container extensions.
const CONTAINER_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "flv", "webm", "ts", "m2ts", "mpg", "mpeg",
];

/// Headerless elementary-stream extensions.
const ELEMENTARY_EXTENSIONS: &[&str] = &["h264", "264", "h265", "265", "hevc", "h266", "266"];

/// Raw filename convention: `name_WIDTHxHEIGHT_FPS.yuv`.
static RAW_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([0-9]+)x([0-9]+)_([0-9]+(?:\.[0-9]+)?)$").expect("valid regex"));

/// Errors raised while resolving a source expression.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source file not found: {0}")]
    NotFound(PathBuf),

    #[error("Directory '{0}' contains no media files")]
    EmptyDirectory(PathBuf),

    #[error("Glob '{0}' matched no media files")]
    NoMatches(String),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error(
        "Raw source '{0}' does not follow the name_WIDTHxHEIGHT_FPS naming convention"
    )]
    RawNameConvention(PathBuf),

    #[error("Failed to probe '{path}': {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    #[error("Probe of '{path}' reported no usable frame rate")]
    MissingFrameRate { path: PathBuf },
}

/// Whether a path's extension is on the media whitelist.
pub fn is_media_file(path: &Path) -> bool {
    match extension_lowercase(path) {
        Some(ext) => {
            RAW_EXTENSIONS.contains(&ext.as_str())
                || CONTAINER_EXTENSIONS.contains(&ext.as_str())
                || ELEMENTARY_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Classify a path by extension.
pub fn classify(path: &Path) -> Option<SourceKind> {
    let ext = extension_lowercase(path)?;
    if RAW_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::Raw)
    } else if CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::Container)
    } else if ELEMENTARY_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::Elementary)
    } else {
        None
    }
}

/// Extract `(width, height, fps)` from a raw source's file stem.
pub fn parse_raw_name(path: &Path) -> Option<(u32, u32, f64)> {
    let stem = path.file_stem()?.to_string_lossy();
    let caps = RAW_NAME_RE.captures(&stem)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    let fps = caps.get(3)?.as_str().parse().ok()?;
    Some((width, height, fps))
}

/// Resolve a source expression into sorted descriptors.
///
/// `default_pix_fmt` applies to raw sources; container/elementary sources
/// take the probed pixel format when available.
pub fn resolve_sources(
    expr: &str,
    prober: &dyn MediaProber,
    default_pix_fmt: &str,
) -> Result<Vec<SourceDescriptor>, SourceError> {
    let mut files = expand_expression(expr)?;
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        sources.push(describe(&file, prober, default_pix_fmt)?);
    }
    info!(expr, count = sources.len(), "resolved sources");
    Ok(sources)
}

/// Expand a path expression into concrete files (unsorted, deduplicated).
fn expand_expression(expr: &str) -> Result<Vec<PathBuf>, SourceError> {
    let expr = expr.trim();

    if expr.contains(',') {
        let mut files = Vec::new();
        for part in expr.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let path = PathBuf::from(part);
            if !path.is_file() {
                return Err(SourceError::NotFound(path));
            }
            files.push(path);
        }
        if files.is_empty() {
            return Err(SourceError::NoMatches(expr.to_string()));
        }
        return Ok(files);
    }

    let path = PathBuf::from(expr);
    if path.is_dir() {
        let mut files: BTreeSet<PathBuf> = BTreeSet::new();
        for entry in std::fs::read_dir(&path).map_err(|_| SourceError::NotFound(path.clone()))? {
            let entry = entry.map_err(|_| SourceError::NotFound(path.clone()))?;
            let candidate = entry.path();
            if candidate.is_file() && is_media_file(&candidate) {
                files.insert(candidate);
            }
        }
        if files.is_empty() {
            return Err(SourceError::EmptyDirectory(path));
        }
        return Ok(files.into_iter().collect());
    }

    if expr.contains('*') || expr.contains('?') || expr.contains('[') {
        let paths = glob::glob(expr).map_err(|source| SourceError::Pattern {
            pattern: expr.to_string(),
            source,
        })?;
        let files: Vec<PathBuf> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file() && is_media_file(p))
            .collect();
        if files.is_empty() {
            return Err(SourceError::NoMatches(expr.to_string()));
        }
        return Ok(files);
    }

    if !path.is_file() {
        return Err(SourceError::NotFound(path));
    }
    Ok(vec![path])
}

/// Build one descriptor, probing when the file is self-describing.
fn describe(
    path: &Path,
    prober: &dyn MediaProber,
    default_pix_fmt: &str,
) -> Result<SourceDescriptor, SourceError> {
    let kind = classify(path).unwrap_or(SourceKind::Container);

    if kind == SourceKind::Raw {
        let (width, height, fps) =
            parse_raw_name(path).ok_or_else(|| SourceError::RawNameConvention(path.to_path_buf()))?;
        return Ok(SourceDescriptor {
            path: path.to_path_buf(),
            kind,
            width,
            height,
            fps,
            pix_fmt: default_pix_fmt.to_string(),
        });
    }

    let info = prober.media_info(path).map_err(|source| SourceError::Probe {
        path: path.to_path_buf(),
        source,
    })?;
    let fps = info
        .fps
        .ok_or_else(|| SourceError::MissingFrameRate {
            path: path.to_path_buf(),
        })?;
    Ok(SourceDescriptor {
        path: path.to_path_buf(),
        kind,
        width: info.width,
        height: info.height,
        fps,
        pix_fmt: info.pix_fmt.unwrap_or_else(|| default_pix_fmt.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FramePacket;
    use crate::probe::MediaInfo;
    use std::fs::File;

    struct FakeProber {
        info: MediaInfo,
    }

    impl FakeProber {
        fn hd() -> Self {
            Self {
                info: MediaInfo {
                    width: 1920,
                    height: 1080,
                    fps: Some(25.0),
                    duration_secs: Some(10.0),
                    bit_rate_bps: Some(4_000_000.0),
                    codec_name: Some("h264".to_string()),
                    pix_fmt: Some("yuv420p".to_string()),
                },
            }
        }
    }

    impl MediaProber for FakeProber {
        fn media_info(&self, _path: &Path) -> Result<MediaInfo, ProbeError> {
            Ok(self.info.clone())
        }
        fn frame_packets(&self, _path: &Path) -> Result<Vec<FramePacket>, ProbeError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn raw_name_convention_parses_exactly() {
        let parsed = parse_raw_name(Path::new("clip_1920x1080_29.97.yuv")).unwrap();
        assert_eq!(parsed, (1920, 1080, 29.97));
        let parsed = parse_raw_name(Path::new("foo_640x360_30.yuv")).unwrap();
        assert_eq!(parsed, (640, 360, 30.0));
        assert!(parse_raw_name(Path::new("clip.yuv")).is_none());
        assert!(parse_raw_name(Path::new("clip_1920x1080.yuv")).is_none());
    }

    #[test]
    fn misformatted_raw_name_errors_never_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("badname.yuv");
        File::create(&bad).unwrap();
        let err = resolve_sources(bad.to_str().unwrap(), &FakeProber::hd(), "yuv420p").unwrap_err();
        assert!(matches!(err, SourceError::RawNameConvention(_)));
    }

    #[test]
    fn raw_source_takes_metadata_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("clip_640x360_24.yuv");
        File::create(&raw).unwrap();
        let sources =
            resolve_sources(raw.to_str().unwrap(), &FakeProber::hd(), "yuv420p10le").unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Raw);
        assert_eq!((sources[0].width, sources[0].height), (640, 360));
        assert_eq!(sources[0].fps, 24.0);
        assert_eq!(sources[0].pix_fmt, "yuv420p10le");
    }

    #[test]
    fn directory_expansion_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.mkv", "notes.txt", "c_320x240_30.yuv"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let sources =
            resolve_sources(dir.path().to_str().unwrap(), &FakeProber::hd(), "yuv420p").unwrap();
        let names: Vec<String> = sources.iter().map(|s| s.file_name()).collect();
        assert_eq!(names, vec!["a.mkv", "b.mp4", "c_320x240_30.yuv"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("readme.md")).unwrap();
        let err =
            resolve_sources(dir.path().to_str().unwrap(), &FakeProber::hd(), "yuv420p").unwrap_err();
        assert!(matches!(err, SourceError::EmptyDirectory(_)));
    }

    #[test]
    fn comma_list_requires_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        File::create(&a).unwrap();
        let expr = format!("{}, {}", a.display(), dir.path().join("missing.mp4").display());
        let err = resolve_sources(&expr, &FakeProber::hd(), "yuv420p").unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn container_source_is_probed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mp4");
        File::create(&file).unwrap();
        let sources =
            resolve_sources(file.to_str().unwrap(), &FakeProber::hd(), "yuv420p").unwrap();
        assert_eq!(sources[0].kind, SourceKind::Container);
        assert_eq!((sources[0].width, sources[0].height), (1920, 1080));
        assert_eq!(sources[0].fps, 25.0);
    }

    #[test]
    fn elementary_extension_classified() {
        assert_eq!(classify(Path::new("a.h265")), Some(SourceKind::Elementary));
        assert_eq!(classify(Path::new("a.hevc")), Some(SourceKind::Elementary));
        assert_eq!(classify(Path::new("a.mkv")), Some(SourceKind::Container));
        assert_eq!(classify(Path::new("a.yuv")), Some(SourceKind::Raw));
        assert_eq!(classify(Path::new("a.txt")), None);
    }

    #[test]
    fn glob_expansion_matches_media_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one.mp4", "two.mp4", "skip.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let expr = format!("{}/*.mp4", dir.path().display());
        let sources = resolve_sources(&expr, &FakeProber::hd(), "yuv420p").unwrap();
        assert_eq!(sources.len(), 2);
    }
}

//! Media source and encoded artifact types.
//!
//! A `SourceDescriptor` is created once by the source resolver and never
//! mutated afterwards. An `EncodedArtifact` is created by the sweep
//! orchestrator after a successful encode, one per (source, control value).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How the bytes of a source file are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Raw planar samples, no header. Resolution/rate come from the filename.
    Raw,
    /// Self-describing container (mp4, mkv, ...).
    Container,
    /// Headerless elementary stream (h264, hevc, ...). Probed like a
    /// container but needs resolution/rate injected when fed to the encoder.
    Elementary,
}

/// A resolved input video, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Path to the source file.
    pub path: PathBuf,
    /// Raw samples vs container vs elementary stream.
    pub kind: SourceKind,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: f64,
    /// Pixel format for raw sources (e.g. "yuv420p").
    pub pix_fmt: String,
}

impl SourceDescriptor {
    /// Whether this source needs explicit rawvideo flags on input.
    pub fn is_raw(&self) -> bool {
        self.kind == SourceKind::Raw
    }

    /// File name (final path component).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File stem (name without extension), used for output naming.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension, if any.
    pub fn extension(&self) -> Option<String> {
        extension_lowercase(&self.path)
    }
}

/// Lowercased extension of a path, if any.
pub fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// One demuxed packet/frame of an encoded artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePacket {
    /// Frame index in decode order.
    pub index: usize,
    /// Picture type reported by the prober ("I", "P", "B"), if known.
    pub pict_type: Option<String>,
    /// Packet size in bytes.
    pub size_bytes: u64,
    /// Best-effort timestamp in seconds, if known.
    pub timestamp: Option<f64>,
}

/// Output of one successful encode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedArtifact {
    /// Path to the encoded file.
    pub path: PathBuf,
    /// Size of the encoded file in bytes.
    pub size_bytes: u64,
    /// Average bitrate in bits/second, when it could be determined.
    pub bitrate_bps: Option<f64>,
    /// Wall-clock seconds spent encoding (0.0 for pre-encoded artifacts).
    pub elapsed_secs: f64,
    /// Frame-level bitrate series, when extractable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packets: Vec<FramePacket>,
}

impl EncodedArtifact {
    /// Total packet payload in bytes, if a packet series is present.
    pub fn packet_bytes(&self) -> Option<u64> {
        if self.packets.is_empty() {
            None
        } else {
            Some(self.packets.iter().map(|p| p.size_bytes).sum())
        }
    }
}

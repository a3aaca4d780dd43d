//! Media probing via the external ffprobe tool.

pub mod ffprobe;

pub use ffprobe::{FfprobeTool, MediaInfo, MediaProber, ProbeError};

//! Shared data model for the sweep pipeline.

pub mod commands;
pub mod media;
pub mod template;

pub use commands::{CommandKind, CommandLogEntry, CommandStatus};
pub use media::{EncodedArtifact, FramePacket, SourceDescriptor, SourceKind};
pub use template::{EncoderKind, MetricKind, RateControl, SweepTemplate, TemplateError};

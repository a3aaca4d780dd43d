//! Command log entry types.
//!
//! Every external-process invocation leaves exactly one entry in the
//! command log. Status moves `Pending -> Running -> {Completed | Failed}`
//! and both terminal states are final.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// What an external command was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Encode,
    Probe,
    Psnr,
    Ssim,
    Vmaf,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Encode => "encode",
            CommandKind::Probe => "probe",
            CommandKind::Psnr => "psnr",
            CommandKind::Ssim => "ssim",
            CommandKind::Vmaf => "vmaf",
        }
    }
}

/// Lifecycle state of one logged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Queued behind the concurrency limit, not yet started.
    Pending,
    /// Process is running.
    Running,
    /// Exit 0 and expected output present.
    Completed,
    /// Non-zero exit, timeout, or missing output.
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Completed | CommandStatus::Failed)
    }
}

/// One append-only audit record for an external-process invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandLogEntry {
    /// Monotonic id within one log.
    pub id: u64,
    /// Command purpose tag.
    pub kind: CommandKind,
    /// Full command line as a display string.
    pub command: String,
    /// Current lifecycle state.
    pub status: CommandStatus,
    /// Source file this command belongs to, when unit-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// When execution began.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Local>>,
    /// When a terminal state was reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Local>>,
    /// Failure detail, verbatim stderr or classification text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!CommandStatus::Pending.is_terminal());
        assert!(!CommandStatus::Running.is_terminal());
        assert!(CommandStatus::Completed.is_terminal());
        assert!(CommandStatus::Failed.is_terminal());
    }

    #[test]
    fn entry_serializes_without_empty_fields() {
        let entry = CommandLogEntry {
            id: 1,
            kind: CommandKind::Encode,
            command: "ffmpeg -y -i in.mp4 out.mp4".to_string(),
            status: CommandStatus::Pending,
            source_file: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"status\":\"pending\""));
        assert!(!json.contains("error_message"));
    }
}

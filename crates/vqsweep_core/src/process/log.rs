//! Append-only command log shared across sweep workers.
//!
//! Each external-process invocation owns exactly one entry; concurrent
//! workers append and update their own entries behind one mutex. Entries
//! are never removed, so snapshot ids are stable for the life of a sweep.

use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use crate::models::{CommandKind, CommandLogEntry, CommandStatus};
use crate::process::runner::{ProcessError, ProcessRunner, RunOutput, RunRequest};

/// Shared, append-only audit trail of external commands.
#[derive(Clone, Default)]
pub struct CommandLog {
    entries: Arc<Mutex<Vec<CommandLogEntry>>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry in Pending state (queued behind the concurrency
    /// limit). Returns its id.
    pub fn enqueue(
        &self,
        kind: CommandKind,
        command: String,
        source_file: Option<String>,
    ) -> u64 {
        let mut entries = self.entries.lock();
        let id = entries.len() as u64 + 1;
        entries.push(CommandLogEntry {
            id,
            kind,
            command,
            status: CommandStatus::Pending,
            source_file,
            started_at: None,
            completed_at: None,
            error_message: None,
        });
        id
    }

    /// Append an entry already in Running state. Returns its id.
    pub fn begin(&self, kind: CommandKind, command: String, source_file: Option<String>) -> u64 {
        let id = self.enqueue(kind, command, source_file);
        self.mark_running(id);
        id
    }

    /// Move a Pending entry to Running and stamp its start time.
    pub fn mark_running(&self, id: u64) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            if !entry.status.is_terminal() {
                entry.status = CommandStatus::Running;
                entry.started_at = Some(Local::now());
            }
        }
    }

    /// Move an entry to a terminal state with optional failure detail.
    pub fn finish(&self, id: u64, status: CommandStatus, error: Option<String>) {
        debug_assert!(status.is_terminal());
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.status = status;
            entry.completed_at = Some(Local::now());
            entry.error_message = error;
        }
    }

    /// Copy of all entries, in append order.
    pub fn snapshot(&self) -> Vec<CommandLogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Run a request through `runner`, recording the attempt in `log`.
///
/// The log entry is the only channel through which failure detail reaches
/// later report rendering; the error is still returned for unit handling.
pub fn run_logged(
    runner: &dyn ProcessRunner,
    log: &CommandLog,
    request: &RunRequest,
) -> Result<RunOutput, ProcessError> {
    let id = log.begin(request.kind, request.command_line(), request.source_file.clone());
    finish_logged(runner, log, id, request)
}

/// Like `run_logged`, but for an entry that was pre-registered as Pending.
pub fn run_enqueued(
    runner: &dyn ProcessRunner,
    log: &CommandLog,
    id: u64,
    request: &RunRequest,
) -> Result<RunOutput, ProcessError> {
    log.mark_running(id);
    finish_logged(runner, log, id, request)
}

fn finish_logged(
    runner: &dyn ProcessRunner,
    log: &CommandLog,
    id: u64,
    request: &RunRequest,
) -> Result<RunOutput, ProcessError> {
    match runner.run(request) {
        Ok(output) => {
            log.finish(id, CommandStatus::Completed, None);
            Ok(output)
        }
        Err(err) => {
            log.finish(id, CommandStatus::Failed, Some(err.to_string()));
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OkRunner;
    impl ProcessRunner for OkRunner {
        fn run(&self, _request: &RunRequest) -> Result<RunOutput, ProcessError> {
            Ok(RunOutput {
                stdout: Vec::new(),
                stderr: String::new(),
            })
        }
    }

    struct FailRunner;
    impl ProcessRunner for FailRunner {
        fn run(&self, request: &RunRequest) -> Result<RunOutput, ProcessError> {
            Err(ProcessError::NonZeroExit {
                program: request.program.clone(),
                code: 1,
                stderr: "boom".to_string(),
            })
        }
    }

    fn request() -> RunRequest {
        RunRequest {
            program: "ffmpeg".to_string(),
            args: vec!["-version".to_string()],
            kind: CommandKind::Encode,
            source_file: Some("clip.yuv".to_string()),
            expected_output: None,
        }
    }

    #[test]
    fn pending_to_running_to_completed() {
        let log = CommandLog::new();
        let id = log.enqueue(CommandKind::Encode, "ffmpeg ...".to_string(), None);
        assert_eq!(log.snapshot()[0].status, CommandStatus::Pending);

        run_enqueued(&OkRunner, &log, id, &request()).unwrap();
        let entry = &log.snapshot()[0];
        assert_eq!(entry.status, CommandStatus::Completed);
        assert!(entry.started_at.is_some());
        assert!(entry.completed_at.is_some());
        assert!(entry.error_message.is_none());
    }

    #[test]
    fn failure_captures_error_text() {
        let log = CommandLog::new();
        let err = run_logged(&FailRunner, &log, &request()).unwrap_err();
        assert!(!err.is_timeout());
        let entry = &log.snapshot()[0];
        assert_eq!(entry.status, CommandStatus::Failed);
        assert!(entry.error_message.as_deref().unwrap_or("").contains("boom"));
        assert_eq!(entry.source_file.as_deref(), Some("clip.yuv"));
    }

    #[test]
    fn ids_are_monotonic_and_append_only() {
        let log = CommandLog::new();
        let a = log.begin(CommandKind::Probe, "ffprobe a".to_string(), None);
        let b = log.begin(CommandKind::Probe, "ffprobe b".to_string(), None);
        assert!(b > a);
        assert_eq!(log.len(), 2);
        log.finish(a, CommandStatus::Completed, None);
        assert_eq!(log.len(), 2);
    }
}

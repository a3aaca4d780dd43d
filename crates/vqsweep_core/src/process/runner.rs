//! External process execution with a wall-clock timeout.
//!
//! The runner executes exactly one command and classifies the outcome. It
//! never retries; retry policy (there is none today) would belong to the
//! sweep orchestrator. The `ProcessRunner` trait is the seam that lets
//! tests substitute a scripted double for the real toolchain.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::CommandKind;

/// Errors from one external-process invocation.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with status {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("'{program}' timed out after {timeout_secs}s")]
    TimedOut { program: String, timeout_secs: u64 },

    #[error("'{program}' completed but expected output is missing: {path}")]
    MissingOutput { program: String, path: PathBuf },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Whether this failure is the distinct timed-out classification.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::TimedOut { .. })
    }
}

/// One command to execute.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Executable path or name.
    pub program: String,
    /// Arguments, exec-style (no shell).
    pub args: Vec<String>,
    /// Purpose tag for the command log.
    pub kind: CommandKind,
    /// Source file the command belongs to, for the log.
    pub source_file: Option<String>,
    /// File that must exist and be non-empty after a zero exit.
    pub expected_output: Option<PathBuf>,
}

impl RunRequest {
    /// Display form of the full command line.
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured output of a completed command.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// The seam between the pipeline and the external toolchain.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, request: &RunRequest) -> Result<RunOutput, ProcessError>;
}

/// Runs commands on the host with a bounded wall-clock wait.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn with_timeout_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, request: &RunRequest) -> Result<RunOutput, ProcessError> {
        let program = request.program.clone();
        debug!(command = %request.command_line(), kind = request.kind.as_str(), "spawning");

        let mut child = Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Drain both pipes on threads so a chatty child never fills a pipe
        // buffer and deadlocks against our wait loop.
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_thread = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout_handle {
                let _ = pipe.read_to_end(&mut buf);
            }
            buf
        });
        let stderr_thread = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_handle {
                let _ = pipe.read_to_end(&mut buf);
            }
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(program = %program, "timeout reached, killing process");
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stdout_thread.join();
                        let _ = stderr_thread.join();
                        return Err(ProcessError::TimedOut {
                            program,
                            timeout_secs: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                Err(source) => {
                    let _ = child.kill();
                    return Err(ProcessError::Io { program, source });
                }
            }
        };

        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr_bytes = stderr_thread.join().unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

        if !status.success() {
            return Err(ProcessError::NonZeroExit {
                program,
                code: status.code().unwrap_or(-1),
                stderr: tail(&stderr, 4000),
            });
        }

        if let Some(expected) = &request.expected_output {
            let present = std::fs::metadata(expected)
                .map(|m| m.len() > 0)
                .unwrap_or(false);
            if !present {
                return Err(ProcessError::MissingOutput {
                    program,
                    path: expected.clone(),
                });
            }
        }

        Ok(RunOutput { stdout, stderr })
    }
}

/// Last `max` bytes of a string, on a char boundary.
fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(program: &str, args: &[&str]) -> RunRequest {
        RunRequest {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            kind: CommandKind::Probe,
            source_file: None,
            expected_output: None,
        }
    }

    #[test]
    fn command_line_joins_program_and_args() {
        let req = request("ffprobe", &["-v", "quiet", "in.mp4"]);
        assert_eq!(req.command_line(), "ffprobe -v quiet in.mp4");
    }

    #[test]
    fn spawn_failure_is_classified() {
        let runner = SystemRunner::with_timeout_secs(5);
        let err = runner
            .run(&request("/nonexistent/binary/for/sure", &[]))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn nonzero_exit_is_classified() {
        let runner = SystemRunner::with_timeout_secs(5);
        let err = runner.run(&request("false", &[])).unwrap_err();
        match err {
            ProcessError::NonZeroExit { code, .. } => assert_ne!(code, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_expected_output_fails_even_on_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::with_timeout_secs(5);
        let mut req = request("true", &[]);
        req.expected_output = Some(dir.path().join("never_written.bin"));
        let err = runner.run(&req).unwrap_err();
        assert!(matches!(err, ProcessError::MissingOutput { .. }));
    }

    #[test]
    fn timeout_kills_and_reports_distinctly() {
        let runner = SystemRunner::new(Duration::from_millis(200));
        let started = Instant::now();
        let err = runner.run(&request("sleep", &["10"])).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn successful_run_captures_stdout() {
        let runner = SystemRunner::with_timeout_secs(5);
        let out = runner.run(&request("echo", &["hello"])).unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let text = "αβγδε";
        let t = tail(text, 3);
        assert!(t.len() <= 3 && text.ends_with(&t));
    }
}

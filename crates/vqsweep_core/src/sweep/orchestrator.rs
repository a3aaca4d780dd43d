//! The sweep orchestrator: encode then measure, per (source, control
//! value) unit, with bounded parallelism and partial-failure collection.
//!
//! A unit failure is recorded and excluded from aggregation but never
//! aborts sibling units. Only source resolution and directory setup
//! abort the whole sweep. Result ordering is deterministic (source name,
//! then ascending control value) regardless of completion order.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::command::{
    build_encode_args, build_metric_args_for, metric_log_name, output_path, output_stem,
};
use crate::config::Settings;
use crate::metrics::{parse_psnr_log, parse_ssim_log, parse_vmaf_log};
use crate::models::{
    CommandKind, CommandStatus, EncodedArtifact, FramePacket, MetricKind, SourceDescriptor,
    SweepTemplate,
};
use crate::probe::{FfprobeTool, MediaProber};
use crate::process::{run_enqueued, CommandLog, ProcessRunner, RunRequest};
use crate::sources::resolve_sources;

use super::errors::{SweepError, UnitError};
use super::types::{SweepOutcome, SweepUnit, UnitFailure, UnitResult, UnitState};

/// One scheduled unit plus its pre-registered encode command.
struct WorkItem {
    unit: SweepUnit,
    /// `(log id, request)`; absent in skip-encode mode.
    encode: Option<(u64, RunRequest)>,
}

/// Drives a whole sweep through the external toolchain.
pub struct SweepRunner {
    settings: Settings,
    runner: Arc<dyn ProcessRunner>,
    log: CommandLog,
}

impl SweepRunner {
    pub fn new(settings: Settings, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            settings,
            runner,
            log: CommandLog::new(),
        }
    }

    /// The shared command log; entries accumulate across runs.
    pub fn command_log(&self) -> CommandLog {
        self.log.clone()
    }

    /// Execute every (source, control value) unit of `template`.
    pub fn run(&self, template: &SweepTemplate) -> Result<SweepOutcome, SweepError> {
        template.validate()?;

        let prober = FfprobeTool::new(&self.settings.tools.ffprobe_path, self.runner.clone());
        let sources = resolve_sources(
            &template.source_path,
            &prober,
            &self.settings.sweep.raw_pix_fmt,
        )?;

        let work = self.layout(template, &sources)?;
        let total = work.len();
        info!(
            template = %template.name,
            sources = sources.len(),
            units = total,
            "sweep laid out"
        );

        let slots: Vec<Mutex<Option<Result<UnitResult, UnitFailure>>>> =
            (0..total).map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);
        let width = self.settings.sweep.parallelism.clamp(1, total.max(1));

        thread::scope(|scope| {
            for _ in 0..width {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= total {
                        break;
                    }
                    let outcome = self.process_unit(template, &work[index]);
                    *slots[index].lock() = Some(outcome);
                });
            }
        });

        let mut outcome = SweepOutcome::default();
        for slot in slots {
            match slot.into_inner() {
                Some(Ok(result)) => outcome.successful.push(result),
                Some(Err(failure)) => outcome.failed.push(failure),
                None => {}
            }
        }
        info!(
            succeeded = outcome.successful.len(),
            failed = outcome.failed.len(),
            "sweep finished"
        );
        Ok(outcome)
    }

    /// Build the deterministic unit list and pre-register encode commands
    /// (Pending) so queued work is visible in the log.
    fn layout(
        &self,
        template: &SweepTemplate,
        sources: &[SourceDescriptor],
    ) -> Result<Vec<WorkItem>, SweepError> {
        fs::create_dir_all(&template.output_dir).map_err(|e| {
            SweepError::setup(format!(
                "cannot create output dir {}: {e}",
                template.output_dir.display()
            ))
        })?;
        let analysis_root = template.output_dir.join(&self.settings.sweep.analysis_subdir);

        let values = template.sorted_control_values();
        let mut work = Vec::with_capacity(sources.len() * values.len());
        for source in sources {
            let analysis_dir = analysis_root.join(source.stem());
            fs::create_dir_all(&analysis_dir).map_err(|e| {
                SweepError::setup(format!(
                    "cannot create analysis dir {}: {e}",
                    analysis_dir.display()
                ))
            })?;

            for &value in &values {
                let unit = SweepUnit {
                    source: source.clone(),
                    control_value: value,
                    stem: output_stem(source, template.rate_control, value),
                    output_path: output_path(
                        &template.output_dir,
                        source,
                        template.encoder,
                        template.rate_control,
                        value,
                    ),
                    analysis_dir: analysis_dir.clone(),
                };
                let encode = if template.skip_encode {
                    None
                } else {
                    let request = RunRequest {
                        program: template.encoder_binary(&self.settings.tools.ffmpeg_path),
                        args: build_encode_args(
                            template.encoder,
                            &template.encoder_params,
                            template.rate_control,
                            value,
                            source,
                            &unit.output_path,
                        ),
                        kind: CommandKind::Encode,
                        source_file: Some(source.file_name()),
                        expected_output: Some(unit.output_path.clone()),
                    };
                    let id = self.log.enqueue(
                        CommandKind::Encode,
                        request.command_line(),
                        Some(source.file_name()),
                    );
                    Some((id, request))
                };
                work.push(WorkItem { unit, encode });
            }
        }
        Ok(work)
    }

    /// Drive one unit through Encoding then Measuring.
    fn process_unit(
        &self,
        template: &SweepTemplate,
        item: &WorkItem,
    ) -> Result<UnitResult, UnitFailure> {
        let unit = &item.unit;
        let fail = |stage: UnitState, err: UnitError| {
            warn!(
                source = %unit.source.file_name(),
                value = unit.control_value,
                stage = ?stage,
                error = %err,
                "unit failed"
            );
            UnitFailure {
                source: unit.source.file_name(),
                control_value: unit.control_value,
                stage,
                message: err.to_string(),
            }
        };

        debug!(stem = %unit.stem, "unit encoding");
        let (artifact_path, elapsed_secs) = match &item.encode {
            Some((id, request)) => {
                let started = Instant::now();
                run_enqueued(self.runner.as_ref(), &self.log, *id, request)
                    .map_err(|e| fail(UnitState::Encoding, e.into()))?;
                (unit.output_path.clone(), started.elapsed().as_secs_f64())
            }
            None => (
                self.find_existing_artifact(unit)
                    .map_err(|e| fail(UnitState::Encoding, e))?,
                0.0,
            ),
        };

        debug!(stem = %unit.stem, "unit measuring");
        let artifact = self.inspect_artifact(unit, artifact_path, elapsed_secs);

        let mut result = UnitResult {
            source: unit.source.file_name(),
            control_value: unit.control_value,
            artifact,
            psnr: None,
            ssim: None,
            vmaf: None,
        };

        if !template.skip_metrics {
            for metric in &template.metrics {
                self.measure(unit, &mut result, *metric)
                    .map_err(|e| fail(UnitState::Measuring, e))?;
            }
        }

        debug!(stem = %unit.stem, "unit done");
        Ok(result)
    }

    /// Skip-encode lookup: exact stem, any extension, in the output dir.
    /// A directory scan, not a glob, so metacharacters in the path are
    /// taken literally.
    fn find_existing_artifact(&self, unit: &SweepUnit) -> Result<PathBuf, UnitError> {
        let dir = unit
            .output_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let stem = std::ffi::OsStr::new(unit.stem.as_str());
        let mut matches: Vec<PathBuf> = fs::read_dir(&dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| {
                        p.is_file() && p.extension().is_some() && p.file_stem() == Some(stem)
                    })
                    .collect()
            })
            .unwrap_or_default();
        matches.sort();
        matches
            .into_iter()
            .next()
            .ok_or_else(|| UnitError::MissingArtifact {
                stem: unit.stem.clone(),
                dir,
            })
    }

    /// Size, bitrate, and frame series of the encoded output. Probe
    /// trouble degrades to an unknown bitrate instead of failing the
    /// unit; the failed probe still shows in the command log.
    fn inspect_artifact(
        &self,
        unit: &SweepUnit,
        path: PathBuf,
        elapsed_secs: f64,
    ) -> EncodedArtifact {
        let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let prober = FfprobeTool::new(&self.settings.tools.ffprobe_path, self.runner.clone())
            .with_log(self.log.clone());

        let info = match prober.media_info(&path) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "artifact probe failed");
                None
            }
        };
        let packets = prober.frame_packets(&path).unwrap_or_default();

        let bitrate_bps = info
            .as_ref()
            .and_then(|i| i.bit_rate_bps)
            .or_else(|| packet_bitrate(&packets, unit.source.fps))
            .or_else(|| {
                info.as_ref()
                    .and_then(|i| i.duration_secs)
                    .filter(|d| *d > 0.0)
                    .map(|d| size_bytes as f64 * 8.0 / d)
            });

        EncodedArtifact {
            path,
            size_bytes,
            bitrate_bps,
            elapsed_secs,
            packets,
        }
    }

    /// Run one metric invocation and parse its log. Parsing belongs to
    /// the command's lifecycle: a run that exits 0 but yields an
    /// unparsable log finishes the entry as Failed.
    fn measure(
        &self,
        unit: &SweepUnit,
        result: &mut UnitResult,
        metric: MetricKind,
    ) -> Result<(), UnitError> {
        let log_path = unit.analysis_dir.join(metric_log_name(&unit.stem, metric));
        let vmaf_model = self.settings.tools.vmaf_model_path.as_deref();
        let request = RunRequest {
            program: self.settings.tools.ffmpeg_path.clone(),
            args: build_metric_args_for(
                metric,
                &unit.source,
                &result.artifact.path,
                &log_path,
                vmaf_model,
            ),
            kind: match metric {
                MetricKind::Psnr => CommandKind::Psnr,
                MetricKind::Ssim => CommandKind::Ssim,
                MetricKind::Vmaf => CommandKind::Vmaf,
            },
            source_file: Some(unit.source.file_name()),
            expected_output: Some(log_path.clone()),
        };

        let id = self
            .log
            .begin(request.kind, request.command_line(), request.source_file.clone());
        let outcome = self
            .runner
            .run(&request)
            .map_err(UnitError::from)
            .and_then(|_| {
                match metric {
                    MetricKind::Psnr => result.psnr = Some(parse_psnr_log(&log_path)?),
                    MetricKind::Ssim => result.ssim = Some(parse_ssim_log(&log_path)?),
                    MetricKind::Vmaf => result.vmaf = Some(parse_vmaf_log(&log_path)?),
                }
                Ok(())
            });
        match &outcome {
            Ok(()) => self.log.finish(id, CommandStatus::Completed, None),
            Err(err) => self.log.finish(id, CommandStatus::Failed, Some(err.to_string())),
        }
        outcome
    }
}

/// Average bitrate from a packet series, using the reference frame rate.
fn packet_bitrate(packets: &[FramePacket], fps: f64) -> Option<f64> {
    if packets.is_empty() || fps <= 0.0 {
        return None;
    }
    let total_bytes: u64 = packets.iter().map(|p| p.size_bytes).sum();
    let duration = packets.len() as f64 / fps;
    (duration > 0.0).then(|| total_bytes as f64 * 8.0 / duration)
}

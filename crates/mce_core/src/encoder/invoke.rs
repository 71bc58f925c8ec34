//! Encoder subprocess execution.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::command::{FfmpegArgsBuilder, DEFAULT_LEVEL, DEFAULT_PROFILE};
use super::discovery::EncoderLocator;
use super::{EncoderError, EncoderResult};
use crate::cancel::CancelHandle;
use crate::models::EncodeJob;
use crate::timeline::StagedTimeline;

/// How often the running encoder is checked for exit and cancellation.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a finished encode.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub output_path: PathBuf,
    /// Size of the written file, `None` if it could not be verified.
    pub output_size: Option<u64>,
    pub exit_code: i32,
    /// Full command line as executed.
    pub command: String,
    /// Non-fatal problems (e.g. output missing after a clean exit).
    pub warnings: Vec<String>,
}

/// Runs one encoder executable.
#[derive(Debug, Clone)]
pub struct EncoderInvoker {
    program: PathBuf,
    require_output: bool,
    profile: Option<String>,
    level: Option<String>,
    faststart: bool,
    poll_interval: Duration,
}

impl EncoderInvoker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            require_output: false,
            profile: Some(DEFAULT_PROFILE.to_string()),
            level: Some(DEFAULT_LEVEL.to_string()),
            faststart: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Treat a missing output file after exit 0 as a failure.
    pub fn with_require_output(mut self, require: bool) -> Self {
        self.require_output = require;
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_level(mut self, level: Option<String>) -> Self {
        self.level = level;
        self
    }

    pub fn with_faststart(mut self, faststart: bool) -> Self {
        self.faststart = faststart;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line tokens for encoding `timeline` into `job.output_path`.
    pub fn arguments(&self, timeline: &StagedTimeline, job: &EncodeJob) -> Vec<String> {
        let pattern = timeline.input_pattern();
        FfmpegArgsBuilder::new(&pattern, job)
            .with_profile(self.profile.as_deref())
            .with_level(self.level.as_deref())
            .with_faststart(self.faststart)
            .build()
    }

    /// Encode a staged timeline, blocking until the encoder exits.
    ///
    /// Every output line is passed to `on_line` with `true` for stderr.
    /// Cancellation kills the encoder and returns [`EncoderError::Cancelled`].
    pub fn run(
        &self,
        timeline: &StagedTimeline,
        job: &EncodeJob,
        cancel: &CancelHandle,
        on_line: &mut dyn FnMut(&str, bool),
    ) -> EncoderResult<EncodeOutcome> {
        if cancel.is_cancelled() {
            return Err(EncoderError::Cancelled);
        }

        if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| EncoderError::io("creating output directory", e))?;
        }

        let tokens = self.arguments(timeline, job);
        let command = format!("{} {}", self.program.display(), tokens.join(" "));
        tracing::debug!("Running encoder: {}", command);

        let mut child = Command::new(&self.program)
            .args(&tokens)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncoderError::Spawn {
                program: self.program.display().to_string(),
                source: e,
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, false, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, true, tx.clone()));
        }
        drop(tx);

        let mut stderr_text = String::new();
        let mut forward = |line: String, is_stderr: bool| {
            if is_stderr {
                stderr_text.push_str(&line);
                stderr_text.push('\n');
            }
            on_line(&line, is_stderr);
        };

        let status = loop {
            match rx.recv_timeout(self.poll_interval) {
                Ok((line, is_stderr)) => forward(line, is_stderr),
                Err(RecvTimeoutError::Timeout) => {}
                // Both pipes closed, the process is on its way out
                Err(RecvTimeoutError::Disconnected) => thread::sleep(self.poll_interval),
            }

            if cancel.is_cancelled() {
                tracing::warn!("Cancelling encoder (pid {})", child.id());
                let _ = child.kill();
                let _ = child.wait();
                join_readers(readers);
                return Err(EncoderError::Cancelled);
            }

            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    join_readers(readers);
                    return Err(EncoderError::io("waiting for encoder", e));
                }
            }
        };

        join_readers(readers);
        for (line, is_stderr) in rx.try_iter() {
            forward(line, is_stderr);
        }

        let exit_code = status.code().unwrap_or(-1);
        if !status.success() {
            return Err(EncoderError::Failed {
                exit_code,
                stderr: stderr_text.trim_end().to_string(),
            });
        }

        let mut warnings = Vec::new();
        let output_size = match std::fs::metadata(&job.output_path) {
            Ok(meta) => Some(meta.len()),
            Err(_) if self.require_output => {
                return Err(EncoderError::OutputMissing(job.output_path.clone()));
            }
            Err(_) => {
                let msg = format!(
                    "Encoder exited cleanly but {} was not found",
                    job.output_path.display()
                );
                tracing::warn!("{}", msg);
                warnings.push(msg);
                None
            }
        };

        Ok(EncodeOutcome {
            output_path: job.output_path.clone(),
            output_size,
            exit_code,
            command,
            warnings,
        })
    }
}

/// Locate the encoder and run it with default options.
pub fn encode(
    timeline: &StagedTimeline,
    job: &EncodeJob,
    locator: &EncoderLocator,
    cancel: &CancelHandle,
) -> EncoderResult<EncodeOutcome> {
    let program = locator.locate()?;
    EncoderInvoker::new(program).run(timeline, job, cancel, &mut |line, is_stderr| {
        if is_stderr {
            tracing::debug!(target: "encoder", "{}", line);
        } else {
            tracing::trace!(target: "encoder", "{}", line);
        }
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    is_stderr: bool,
    tx: Sender<(String, bool)>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send((line, is_stderr)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn join_readers(readers: Vec<JoinHandle<()>>) {
    for reader in readers {
        let _ = reader.join();
    }
}

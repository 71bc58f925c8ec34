//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::encoder::{EncodeOutcome, EncoderLocator};
use crate::logging::ChannelLogger;
use crate::models::{ChannelSpec, FrameSequence};
use crate::timeline::StagedTimeline;

/// Read-only context passed to pipeline steps.
///
/// Contains channel configuration and shared resources that steps can read
/// but not modify. Mutable state goes in `ChannelState`.
pub struct Context {
    /// Channel specification with directories resolved.
    pub channel: ChannelSpec,
    /// Application settings.
    pub settings: Arc<Settings>,
    /// Directory scanned for frames.
    pub frames_dir: PathBuf,
    /// Destination video file.
    pub output_path: PathBuf,
    /// Parent of the per-channel staging directory.
    pub staging_root: PathBuf,
    /// Where converted HDR frames are cached.
    pub hdr_cache_dir: PathBuf,
    /// Per-channel logger.
    pub logger: Arc<ChannelLogger>,
    /// Shared cancellation flag.
    pub cancel: CancelHandle,
    /// Encoder discovery, shared across channels so the first hit is reused.
    pub encoder: Arc<EncoderLocator>,
}

impl Context {
    /// Create a context for `channel`.
    ///
    /// Missing frame or output paths in `channel` resolve to empty paths;
    /// callers resolve them through `ProjectLayout` first.
    pub fn new(channel: ChannelSpec, settings: Arc<Settings>, logger: Arc<ChannelLogger>) -> Self {
        let frames_dir = channel.frames_dir.clone().unwrap_or_default();
        let output_path = channel.output_path.clone().unwrap_or_default();
        let staging_root = PathBuf::from(&settings.paths.temp_root);
        let hdr_cache_dir = settings.paths.hdr_cache_dir(&channel.name);
        let encoder = EncoderLocator::new().with_explicit_path(settings.encoder.explicit_path());

        Self {
            channel,
            settings,
            frames_dir,
            output_path,
            staging_root,
            hdr_cache_dir,
            logger,
            cancel: CancelHandle::new(),
            encoder: Arc::new(encoder),
        }
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_encoder_locator(mut self, encoder: Arc<EncoderLocator>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_staging_root(mut self, staging_root: impl Into<PathBuf>) -> Self {
        self.staging_root = staging_root.into();
        self
    }

    pub fn with_hdr_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.hdr_cache_dir = dir.into();
        self
    }

    pub fn channel_name(&self) -> &str {
        &self.channel.name
    }
}

/// Mutable channel state that accumulates results from pipeline steps.
///
/// Each step's output is stored in its own section. The staged timeline
/// is owned here, so dropping the state removes the staging directory.
#[derive(Debug, Default)]
pub struct ChannelState {
    /// Channel being processed.
    pub channel_name: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// Frames found by the Locate step.
    pub located: Option<FrameSequence>,
    /// Conversion results (Convert step).
    pub conversion: Option<ConversionOutput>,
    /// Staged timeline (Stage step).
    pub staged: Option<StagedTimeline>,
    /// Number of files staged, kept after the timeline is released.
    pub frames_staged: usize,
    /// Encoder results (Encode step).
    pub encode: Option<EncodeOutcome>,
}

impl ChannelState {
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn frames_found(&self) -> usize {
        self.located.as_ref().map_or(0, FrameSequence::len)
    }

    /// Frames to stage: converted frames when conversion ran, else the
    /// located ones.
    pub fn frames_for_staging(&self) -> Option<&FrameSequence> {
        self.conversion
            .as_ref()
            .map(|c| &c.frames)
            .or(self.located.as_ref())
    }

    /// Remove the staging directory now instead of on drop.
    pub fn release_staging(&mut self) -> std::io::Result<()> {
        match self.staged.take() {
            Some(staged) => staged.close(),
            None => Ok(()),
        }
    }
}

/// Output from the Convert step.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Display-referred frames in timeline order.
    pub frames: FrameSequence,
    /// Frames converted during this run.
    pub converted: usize,
    /// Frames reused from the cache.
    pub cached: usize,
    /// Frames that failed and were skipped.
    pub failed: usize,
    /// Cache directory used.
    pub cache_dir: PathBuf,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}

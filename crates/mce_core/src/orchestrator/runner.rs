//! Channel runner for exporting one or more channels.
//!
//! `ChannelRunner` resolves each channel against the project layout, runs
//! it through the standard pipeline and turns the outcome into a
//! `ChannelResult`. Failures never escape a channel.

use std::sync::Arc;
use std::thread;

use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::encoder::EncoderLocator;
use crate::logging::{ChannelLogger, LogCallback};
use crate::models::{ChannelResult, ChannelSpec, RunSummary};
use crate::project::ProjectLayout;

use super::create_standard_pipeline;
use super::errors::PipelineError;
use super::types::{ChannelState, Context};

/// Builds a log callback for a channel name.
pub type LogCallbackFactory = Arc<dyn Fn(&str) -> Option<LogCallback> + Send + Sync>;

/// Runs channels through the pipeline.
///
/// # Example
///
/// ```ignore
/// let runner = ChannelRunner::new(settings);
/// let summary = runner.run_all(&channels);
/// std::process::exit(if summary.success() { 0 } else { 1 });
/// ```
pub struct ChannelRunner {
    settings: Arc<Settings>,
    layout: ProjectLayout,
    encoder: Arc<EncoderLocator>,
    cancel: CancelHandle,
    parallel: bool,
    log_callback_factory: Option<LogCallbackFactory>,
}

impl ChannelRunner {
    /// Create a runner from settings.
    ///
    /// The project root, encoder path and parallelism come from `settings`.
    pub fn new(settings: Settings) -> Self {
        let layout = ProjectLayout::new(&settings.paths.output_root);
        let encoder = EncoderLocator::new().with_explicit_path(settings.encoder.explicit_path());
        let parallel = settings.staging.parallel;
        Self {
            settings: Arc::new(settings),
            layout,
            encoder: Arc::new(encoder),
            cancel: CancelHandle::new(),
            parallel,
            log_callback_factory: None,
        }
    }

    pub fn with_encoder_locator(mut self, locator: EncoderLocator) -> Self {
        self.encoder = Arc::new(locator);
        self
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run channels on separate threads in `run_all`.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_log_callback<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Option<LogCallback> + Send + Sync + 'static,
    {
        self.log_callback_factory = Some(Arc::new(factory));
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn encoder(&self) -> &EncoderLocator {
        &self.encoder
    }

    /// Export one channel.
    ///
    /// The staging directory is removed before this returns, whatever the
    /// outcome.
    pub fn run_channel(&self, spec: &ChannelSpec) -> ChannelResult {
        let spec = self.layout.resolve(spec);
        let name = spec.name.clone();

        if self.cancel.is_cancelled() {
            return ChannelResult::failure(&name, PipelineError::cancelled(&name).to_string());
        }
        if let Err(e) = validate_spec(&spec) {
            tracing::error!("{}", e);
            return ChannelResult::failure(&name, e.to_string());
        }

        let callback = self
            .log_callback_factory
            .as_ref()
            .and_then(|factory| factory(&name));
        let logger = match ChannelLogger::new(
            &name,
            &self.settings.paths.logs_folder,
            self.settings.logging.log_config(),
            callback,
        ) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                let err = PipelineError::setup_failed(&name, format!("Failed to create logger: {}", e));
                tracing::error!("{}", err);
                return ChannelResult::failure(&name, err.to_string());
            }
        };

        let ctx = Context::new(spec, Arc::clone(&self.settings), Arc::clone(&logger))
            .with_cancel_handle(self.cancel.clone())
            .with_encoder_locator(Arc::clone(&self.encoder));
        let mut state = ChannelState::new(&name);
        let pipeline = create_standard_pipeline().with_cancel_handle(self.cancel.clone());

        tracing::info!("Channel '{}' started", name);
        logger.info(&format!("Starting channel: {}", name));
        logger.info(&format!(
            "Frames: {} ('{}_*'), output: {}",
            ctx.frames_dir.display(),
            ctx.channel.base_name,
            ctx.output_path.display()
        ));

        let run = pipeline.run(&ctx, &mut state);

        if let Err(e) = state.release_staging() {
            logger.warn(&format!("Failed to remove staging directory: {}", e));
        }

        let result = match run {
            Ok(run_result) => {
                let (output_path, output_size) = match state.encode {
                    Some(ref encode) => (encode.output_path.clone(), encode.output_size),
                    None => (ctx.output_path.clone(), None),
                };
                let mut message = format!(
                    "Encoded {} frame(s) to {}",
                    state.frames_staged,
                    output_path.display()
                );
                if !run_result.steps_skipped.is_empty() {
                    message.push_str(&format!(" (skipped: {})", run_result.steps_skipped.join(", ")));
                }
                if output_size.is_none() {
                    message.push_str(" [output not verified]");
                }
                tracing::info!("Channel '{}' finished: {}", name, output_path.display());
                ChannelResult::success(&name, output_path, message).with_output_size(output_size)
            }
            Err(e) => {
                let message = e.to_string();
                logger.error(&message);
                tracing::error!("{}", message);
                ChannelResult::failure(&name, message)
            }
        };

        logger.info(&format!("Log written to {}", logger.log_path().display()));
        logger.flush();
        result.with_counts(state.frames_found(), state.frames_staged)
    }

    /// Export every channel and aggregate the results.
    ///
    /// Channels run one after another unless parallel mode is on, in which
    /// case each gets its own thread and staging directory. A channel named
    /// more than once (ignoring case) runs only the first time.
    pub fn run_all(&self, specs: &[ChannelSpec]) -> RunSummary {
        let specs = &unique_channels(specs);
        let results = if self.parallel && specs.len() > 1 {
            tracing::info!("Running {} channel(s) in parallel", specs.len());
            thread::scope(|scope| {
                let handles: Vec<_> = specs
                    .iter()
                    .map(|spec| (spec, scope.spawn(move || self.run_channel(spec))))
                    .collect();
                handles
                    .into_iter()
                    .map(|(spec, handle)| {
                        handle.join().unwrap_or_else(|_| {
                            ChannelResult::failure(&spec.name, "Channel worker panicked")
                        })
                    })
                    .collect()
            })
        } else {
            specs.iter().map(|spec| self.run_channel(spec)).collect()
        };

        let summary = RunSummary::new(results);
        log_summary(&summary);
        summary
    }
}

/// Drop repeated channel names, keeping the first occurrence.
///
/// Two workers on one name would share its log file and conversion cache.
fn unique_channels(specs: &[ChannelSpec]) -> Vec<ChannelSpec> {
    let mut unique: Vec<ChannelSpec> = Vec::with_capacity(specs.len());
    for spec in specs {
        if unique.iter().any(|u| u.name.eq_ignore_ascii_case(&spec.name)) {
            tracing::warn!("Channel '{}' listed more than once, running it once", spec.name);
        } else {
            unique.push(spec.clone());
        }
    }
    unique
}

fn validate_spec(spec: &ChannelSpec) -> Result<(), PipelineError> {
    if spec.name.trim().is_empty() {
        return Err(PipelineError::setup_failed("<unnamed>", "Channel name is empty"));
    }
    if spec.fps == 0 {
        return Err(PipelineError::setup_failed(&spec.name, "fps must be positive"));
    }
    spec.loop_spec
        .validate()
        .map_err(|e| PipelineError::setup_failed(&spec.name, e))
}

fn log_summary(summary: &RunSummary) {
    for result in &summary.channels {
        if result.success {
            tracing::info!("[OK] {}: {}", result.channel_name, result.message);
        } else {
            tracing::warn!("[FAILED] {}: {}", result.channel_name, result.message);
        }
    }
    tracing::info!(
        "{} of {} channel(s) succeeded",
        summary.succeeded().count(),
        summary.channels.len()
    );
}

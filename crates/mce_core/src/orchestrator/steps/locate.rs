//! Locate step - finds the channel's rendered frames.

use crate::frames::find_frames_with;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{ChannelState, Context, StepOutcome};

/// Scans the frames directory for `<base>_<index>.<ext>` files.
pub struct LocateStep;

impl LocateStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for LocateStep {
    fn name(&self) -> &str {
        "Locate"
    }

    fn description(&self) -> &str {
        "Find rendered frames for the channel"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.channel.base_name.trim().is_empty() {
            return Err(StepError::invalid_input("Base name is empty"));
        }
        if ctx.frames_dir.as_os_str().is_empty() {
            return Err(StepError::invalid_input("Frames directory is not set"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut ChannelState) -> StepResult<StepOutcome> {
        ctx.logger.info(&format!(
            "Scanning {} for '{}_*'",
            ctx.frames_dir.display(),
            ctx.channel.base_name
        ));

        let frames = find_frames_with(
            &ctx.frames_dir,
            &ctx.channel.base_name,
            ctx.settings.frames.index_policy,
        )?;

        if frames.is_empty() {
            return Err(StepError::no_frames(&ctx.frames_dir, &ctx.channel.base_name));
        }

        let extensions: Vec<String> = frames.extensions().into_iter().collect();
        ctx.logger.info(&format!(
            "Found {} frame(s) [{}]",
            frames.len(),
            extensions.join(", ")
        ));
        if let (Some(first), Some(last)) = (frames.first(), frames.last()) {
            ctx.logger
                .debug(&format!("First: {}, last: {}", first.file_name(), last.file_name()));
        }

        state.located = Some(frames);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &ChannelState) -> StepResult<()> {
        match state.located {
            Some(ref frames) if !frames.is_empty() => Ok(()),
            _ => Err(StepError::invalid_output("No frames recorded")),
        }
    }
}

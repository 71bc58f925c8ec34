//! Stage step - materialises the frame timeline for the encoder.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{ChannelState, Context, StepOutcome};
use crate::timeline::build_timeline_with;

/// Copies (or links) frames into a contiguous `frame_NNNN.<ext>` sequence,
/// applying the loop extension when enabled.
pub struct StageStep;

impl StageStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StageStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for StageStep {
    fn name(&self) -> &str {
        "Stage"
    }

    fn description(&self) -> &str {
        "Stage frames into a numbered timeline"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        ctx.channel
            .loop_spec
            .validate()
            .map_err(StepError::invalid_input)?;
        std::fs::create_dir_all(&ctx.staging_root)
            .map_err(|e| StepError::io_error("creating staging root", e))
    }

    fn execute(&self, ctx: &Context, state: &mut ChannelState) -> StepResult<StepOutcome> {
        let frames = state
            .frames_for_staging()
            .ok_or_else(|| StepError::no_input("No frames to stage"))?;

        let loop_spec = &ctx.channel.loop_spec;
        if loop_spec.enabled {
            ctx.logger.info(&format!(
                "Staging {} frame(s) with loop (hold {})",
                frames.len(),
                loop_spec.hold_frames
            ));
        } else {
            ctx.logger
                .info(&format!("Staging {} frame(s)", frames.len()));
        }

        let staged = build_timeline_with(
            frames,
            loop_spec,
            &ctx.staging_root,
            ctx.settings.staging.mode,
        )?;

        ctx.logger.info(&format!(
            "Staged {} file(s) in {}",
            staged.len(),
            staged.path().display()
        ));

        state.frames_staged = staged.len();
        state.staged = Some(staged);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &ChannelState) -> StepResult<()> {
        let staged = state
            .staged
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Staged timeline not recorded"))?;

        let source_len = state.frames_for_staging().map_or(0, |f| f.len());
        let expected = ctx.channel.loop_spec.timeline_len(source_len);
        if staged.len() != expected {
            return Err(StepError::invalid_output(format!(
                "Expected {} staged file(s), found {}",
                expected,
                staged.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelSpec, Frame, FrameSequence, LoopSpec};
    use crate::orchestrator::types::test_support::context_in;
    use std::fs;
    use tempfile::tempdir;

    fn located(dir: &std::path::Path, n: u64) -> FrameSequence {
        let frames = (1..=n)
            .map(|i| {
                let path = dir.join(format!("p_{:03}.png", i));
                fs::write(&path, format!("frame {}", i)).unwrap();
                Frame::new(i, path)
            })
            .collect();
        FrameSequence::new(frames)
    }

    #[test]
    fn stages_looped_timeline() {
        let dir = tempdir().unwrap();
        let spec = ChannelSpec::new("mobile", dir.path(), "p", dir.path().join("o.mp4"))
            .with_loop(LoopSpec::looped(3).unwrap());
        let ctx = context_in(dir.path(), spec);
        let mut state = ChannelState::new("mobile");
        state.located = Some(located(dir.path(), 5));

        let step = StageStep::new();
        step.validate_input(&ctx).unwrap();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        assert_eq!(state.frames_staged, 16);
        let staged_dir = state.staged.as_ref().unwrap().path().to_path_buf();
        assert!(staged_dir.starts_with(&ctx.staging_root));

        state.release_staging().unwrap();
        assert!(!staged_dir.exists());
    }

    #[test]
    fn requires_frames() {
        let dir = tempdir().unwrap();
        let spec = ChannelSpec::new("mobile", dir.path(), "p", dir.path().join("o.mp4"));
        let ctx = context_in(dir.path(), spec);
        let mut state = ChannelState::new("mobile");
        let err = StageStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::NoInput(_)));
    }
}

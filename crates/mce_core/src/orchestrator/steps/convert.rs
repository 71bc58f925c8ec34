//! Convert step - turns linear EXR frames into display-referred PNGs.

use crate::hdr::convert_frames;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{ChannelState, Context, ConversionOutput, StepOutcome};

/// Converts HDR frames through the configured view transform.
///
/// Skipped when conversion is disabled or any located frame is not EXR.
pub struct ConvertStep;

impl ConvertStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConvertStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ConvertStep {
    fn name(&self) -> &str {
        "Convert"
    }

    fn description(&self) -> &str {
        "Convert EXR frames to display-referred PNG"
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut ChannelState) -> StepResult<StepOutcome> {
        let frames = state
            .located
            .as_ref()
            .ok_or_else(|| StepError::no_input("No located frames to convert"))?;

        if !frames.is_all_hdr() {
            return Ok(StepOutcome::Skipped("frames are not EXR".to_string()));
        }
        if !ctx.settings.hdr.enabled {
            return Ok(StepOutcome::Skipped("HDR conversion disabled".to_string()));
        }

        let options = ctx.settings.hdr.convert_options();
        let cache_dir = ctx.hdr_cache_dir.join(options.cache_key());
        ctx.logger.info(&format!(
            "Converting {} EXR frame(s) ({}, exposure {:+.2}) into {}",
            frames.len(),
            options.view_transform,
            options.exposure,
            cache_dir.display()
        ));

        let report = convert_frames(frames, &ctx.hdr_cache_dir, &options, Some(&ctx.cancel));
        if report.cancelled {
            return Err(StepError::Cancelled);
        }

        for (path, err) in &report.failed {
            ctx.logger
                .warn(&format!("Skipping {}: {}", path.display(), err));
        }
        ctx.logger.info(&format!(
            "{} converted, {} cached, {} failed",
            report.converted,
            report.cached,
            report.failed.len()
        ));

        state.conversion = Some(ConversionOutput {
            frames: report.frames,
            converted: report.converted,
            cached: report.cached,
            failed: report.failed.len(),
            cache_dir,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &ChannelState) -> StepResult<()> {
        let conversion = state
            .conversion
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Conversion results not recorded"))?;
        if conversion.frames.is_empty() {
            return Err(StepError::invalid_output("No frame could be converted"));
        }
        Ok(())
    }
}

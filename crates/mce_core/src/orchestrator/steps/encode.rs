//! Encode step - runs the video encoder over the staged timeline.

use crate::encoder::{EncoderError, EncoderInvoker, ENCODER_PROGRAM};
use crate::models::EncodeJob;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{ChannelState, Context, StepOutcome};

/// Encodes the staged timeline into the channel's output file.
///
/// The encoder executable comes from the context's shared locator.
pub struct EncodeStep;

impl EncodeStep {
    pub fn new() -> Self {
        Self
    }

    /// Build the encode request for this channel.
    fn build_job(&self, ctx: &Context) -> EncodeJob {
        EncodeJob::new(&ctx.output_path, ctx.channel.fps, ctx.channel.quality)
            .with_overrides(ctx.channel.overrides.clone())
            .with_gop_size(ctx.settings.encoder.gop())
    }

    fn build_invoker(&self, ctx: &Context, program: std::path::PathBuf) -> EncoderInvoker {
        let encoder = &ctx.settings.encoder;
        EncoderInvoker::new(program)
            .with_require_output(encoder.require_output)
            .with_profile(encoder.profile())
            .with_level(encoder.level())
            .with_faststart(encoder.faststart)
    }
}

impl Default for EncodeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for EncodeStep {
    fn name(&self) -> &str {
        "Encode"
    }

    fn description(&self) -> &str {
        "Encode staged frames into the output video"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.channel.fps == 0 {
            return Err(StepError::invalid_input("fps must be positive"));
        }
        if ctx.output_path.as_os_str().is_empty() {
            return Err(StepError::invalid_input("Output path is not set"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut ChannelState) -> StepResult<StepOutcome> {
        let staged = state
            .staged
            .as_ref()
            .ok_or_else(|| StepError::no_input("No staged timeline to encode"))?;

        let program = ctx.encoder.locate()?;
        ctx.logger
            .info(&format!("Using encoder: {}", program.display()));

        let job = self.build_job(ctx);
        let params = job.params();
        ctx.logger.info(&format!(
            "Encoding {} frame(s) at {} fps ({}, crf {}, preset {}) -> {}",
            staged.len(),
            job.fps,
            params.codec,
            params.crf,
            params.preset,
            job.output_path.display()
        ));

        let invoker = self.build_invoker(ctx, program);
        let tokens = invoker.arguments(staged, &job);
        let program_name = invoker.program().display().to_string();
        ctx.logger
            .command(&format!("{} {}", program_name, tokens.join(" ")));
        if ctx.settings.logging.show_options_pretty {
            ctx.logger.log_arguments_pretty(&program_name, &tokens);
        }

        ctx.logger.section("Running encoder");
        ctx.logger.clear_tail();
        let total = Some(staged.len());
        let result = invoker.run(staged, &job, &ctx.cancel, &mut |line, is_stderr| {
            ctx.logger.output_line(line, is_stderr, total)
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(EncoderError::Failed { exit_code, stderr }) => {
                ctx.logger.show_tail("encoder output");
                return Err(StepError::command_failed(ENCODER_PROGRAM, exit_code, stderr));
            }
            Err(e) => {
                ctx.logger.show_tail("encoder output");
                return Err(e.into());
            }
        };

        for warning in &outcome.warnings {
            ctx.logger.warn(warning);
        }
        match outcome.output_size {
            Some(size) => ctx.logger.success(&format!(
                "Wrote {} ({} bytes)",
                outcome.output_path.display(),
                size
            )),
            None => ctx.logger.info(&format!(
                "Encoder finished: {}",
                outcome.output_path.display()
            )),
        }

        state.encode = Some(outcome);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &ChannelState) -> StepResult<()> {
        let encode = state
            .encode
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Encode results not recorded"))?;
        if encode.exit_code != 0 {
            return Err(StepError::invalid_output(format!(
                "Encoder exit code {}",
                encode.exit_code
            )));
        }
        Ok(())
    }
}

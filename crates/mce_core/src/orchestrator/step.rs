//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use super::errors::StepResult;
use super::types::{ChannelState, Context, StepOutcome};

/// Trait for pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// # Example
///
/// ```ignore
/// struct ProbeStep;
///
/// impl PipelineStep for ProbeStep {
///     fn name(&self) -> &str { "Probe" }
///
///     fn validate_input(&self, ctx: &Context) -> StepResult<()> {
///         if !ctx.frames_dir.is_dir() {
///             return Err(StepError::invalid_input("frames directory missing"));
///         }
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut ChannelState) -> StepResult<StepOutcome> {
///         // Inspect frames...
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, _state: &ChannelState) -> StepResult<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Step name (for logging and error context).
    fn name(&self) -> &str;

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    /// Execute the step's main work and record results in `state`.
    ///
    /// Returns `StepOutcome::Skipped` when the step does not apply to this
    /// channel (not an error).
    fn execute(&self, ctx: &Context, state: &mut ChannelState) -> StepResult<StepOutcome>;

    /// Validate outputs after `execute` returned `Success`.
    fn validate_output(&self, ctx: &Context, state: &ChannelState) -> StepResult<()>;

    /// Whether this step can be skipped.
    fn is_optional(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStep {
        name: &'static str,
        should_skip: bool,
    }

    impl PipelineStep for MockStep {
        fn name(&self) -> &str {
            self.name
        }

        fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut ChannelState) -> StepResult<StepOutcome> {
            if self.should_skip {
                Ok(StepOutcome::Skipped("Test skip".to_string()))
            } else {
                Ok(StepOutcome::Success)
            }
        }

        fn validate_output(&self, _ctx: &Context, _state: &ChannelState) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn step_trait_object_works() {
        let step: Box<dyn PipelineStep> = Box::new(MockStep {
            name: "TestStep",
            should_skip: true,
        });

        assert_eq!(step.name(), "TestStep");
        assert_eq!(step.description(), "TestStep");
        assert!(!step.is_optional());
    }
}

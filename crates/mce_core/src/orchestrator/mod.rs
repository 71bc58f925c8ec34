//! Pipeline orchestrator for coordinating channel exports.
//!
//! This module provides the infrastructure for running multi-step
//! processing pipelines. Each channel runs a sequence of steps
//! that validate, execute, and record their results.
//!
//! # Architecture
//!
//! ```text
//! ChannelRunner
//!     └── Pipeline (per channel)
//!             ├── Step: Locate
//!             ├── Step: Convert (EXR only)
//!             ├── Step: Stage
//!             └── Step: Encode
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mce_core::orchestrator::ChannelRunner;
//!
//! let runner = ChannelRunner::new(settings);
//! let summary = runner.run_all(&settings.channels);
//! for failed in summary.failed() {
//!     eprintln!("{}: {}", failed.channel_name, failed.message);
//! }
//! ```

mod errors;
mod pipeline;
mod runner;
mod step;
pub mod steps;
mod types;

pub use crate::cancel::CancelHandle;
pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use runner::{ChannelRunner, LogCallbackFactory};
pub use step::PipelineStep;
pub use steps::{ConvertStep, EncodeStep, LocateStep, StageStep};
pub use types::{ChannelState, Context, ConversionOutput, StepOutcome};

/// Create a standard pipeline with all steps in the correct order.
///
/// 1. Locate - find `<base>_<index>.<ext>` frames
/// 2. Convert - EXR to display PNG (skipped for other formats)
/// 3. Stage - number frames into a temporary timeline, with optional loop
/// 4. Encode - run the encoder over the staged timeline
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(LocateStep::new())
        .with_step(ConvertStep::new())
        .with_step(StageStep::new())
        .with_step(EncodeStep::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_order() {
        let pipeline = create_standard_pipeline();
        assert_eq!(
            pipeline.step_names(),
            vec!["Locate", "Convert", "Stage", "Encode"]
        );
    }
}

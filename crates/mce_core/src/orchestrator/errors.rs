//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Channel → Step → Operation → Detail

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::encoder::EncoderError;
use crate::frames::FrameError;
use crate::timeline::TimelineError;

/// Top-level pipeline error with channel context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Channel '{channel}' failed at step '{step_name}': {source}")]
    StepFailed {
        channel: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Pipeline was cancelled.
    #[error("Channel '{channel}' was cancelled")]
    Cancelled { channel: String },

    /// Failed to set up the channel run (logger, directories).
    #[error("Channel '{channel}' setup failed: {message}")]
    SetupFailed { channel: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        channel: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            channel: channel.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn setup_failed(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            channel: channel.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(channel: impl Into<String>) -> Self {
        Self::Cancelled {
            channel: channel.into(),
        }
    }

    /// The step error behind this failure, if any.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// The step needs output of an earlier step that is missing.
    #[error("No input: {0}")]
    NoInput(String),

    /// Frame discovery matched nothing.
    #[error("no frames found in {directory} matching {base_name}_*")]
    NoFrames {
        directory: String,
        base_name: String,
    },

    /// Frame discovery failed.
    #[error(transparent)]
    Frames(#[from] FrameError),

    /// Staging failed.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Encoder could not be located or run.
    #[error(transparent)]
    Encoder(#[from] EncoderError),

    /// An external command failed.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Cancellation observed inside the step.
    #[error("Cancelled")]
    Cancelled,
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn no_input(message: impl Into<String>) -> Self {
        Self::NoInput(message.into())
    }

    pub fn no_frames(directory: &Path, base_name: impl Into<String>) -> Self {
        Self::NoFrames {
            directory: directory.display().to_string(),
            base_name: base_name.into(),
        }
    }

    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Encoder(EncoderError::Cancelled))
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_context() {
        let err = StepError::command_failed("ffmpeg", 1, "Unknown encoder 'libx999'");
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("libx999"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::no_frames(Path::new("/render/MobileFrames"), "proj");
        let pipeline_err = PipelineError::step_failed("mobile", "Locate", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("mobile"));
        assert!(msg.contains("Locate"));
        assert!(msg.contains("no frames found"));
        assert!(pipeline_err.step_error().is_some());
    }

    #[test]
    fn encoder_cancellation_counts_as_cancelled() {
        assert!(StepError::Encoder(EncoderError::Cancelled).is_cancelled());
        assert!(!StepError::no_input("x").is_cancelled());
    }
}

//! External video encoder (FFmpeg) discovery and invocation.
//!
//! - [`EncoderLocator`] resolves the encoder executable once per run
//! - [`FfmpegArgsBuilder`] turns a staged timeline and an [`EncodeJob`] into
//!   command-line tokens
//! - [`EncoderInvoker`] runs the encoder, streams its output and verifies
//!   the produced file
//!
//! [`EncodeJob`]: crate::models::EncodeJob

mod command;
mod discovery;
mod invoke;

#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use command::{
    FfmpegArgsBuilder, DEFAULT_GOP_SIZE, DEFAULT_LEVEL, DEFAULT_PROFILE, EVEN_DIMENSIONS_FILTER,
};
pub use discovery::{known_paths, EncoderLocator, ENCODER_PROGRAM};
pub use invoke::{encode, EncodeOutcome, EncoderInvoker};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or running the encoder.
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("Encoder '{program}' not found (searched: {searched})")]
    NotFound { program: String, searched: String },

    #[error("Failed to start encoder {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Encoder exited with code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("Encoder reported success but {0} was not written")]
    OutputMissing(PathBuf),

    #[error("Encoding cancelled")]
    Cancelled,

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl EncoderError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

pub type EncoderResult<T> = Result<T, EncoderError>;

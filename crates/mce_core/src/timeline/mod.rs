//! Staged timeline construction.
//!
//! The external encoder reads frames through a printf-style pattern
//! (`frame_%04d.png`), so the discovered frames are renumbered into a
//! gap-free, 1-based sequence inside a scoped temporary directory. With the
//! loop extension enabled the timeline becomes
//! forward → hold last → reverse → hold first.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use mce_core::frames::find_frames;
//! use mce_core::models::LoopSpec;
//! use mce_core::timeline::build_timeline;
//!
//! let frames = find_frames(Path::new("/render/MobileFrames"), "proj");
//! let staged = build_timeline(&frames, &LoopSpec::looped(15).unwrap(), Path::new("/tmp")).unwrap();
//! println!("{} staged frames at {}", staged.len(), staged.input_pattern().display());
//! // The staging directory is removed when `staged` is dropped.
//! ```

mod builder;
mod staged;

pub use builder::{build_timeline, build_timeline_with, plan_timeline};
pub use staged::{StagedTimeline, STAGED_PREFIX};

use std::io;

use thiserror::Error;

/// Errors that can occur while staging a timeline.
#[derive(Error, Debug)]
pub enum TimelineError {
    /// There were no frames to stage.
    #[error("Cannot build a timeline from an empty frame sequence")]
    EmptyInput,

    /// Frames use more than one extension and cannot share one input pattern.
    #[error("Frames use mixed extensions ({0}); the encoder needs a single format")]
    MixedExtensions(String),

    /// Writing the staged frames failed.
    #[error("Staging I/O error while {operation}: {source}")]
    Staging {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl TimelineError {
    /// Create a staging I/O error with context.
    pub fn staging(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Staging {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;

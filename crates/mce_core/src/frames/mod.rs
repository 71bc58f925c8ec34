//! Frame discovery for rendered image sequences.
//!
//! Scans a directory for `<base>_<index>.<ext>` files across every
//! recognised still-image extension and returns them in a deterministic
//! ascending order.

mod locator;

pub use locator::{find_frames, find_frames_with, parse_frame_index};

use thiserror::Error;

/// Errors that can occur while locating frames.
#[derive(Error, Debug)]
pub enum FrameError {
    /// A filename carried no parseable index under the strict policy.
    #[error("Cannot parse frame index from '{path}'")]
    Discovery { path: String },

    /// The constructed glob pattern was rejected.
    #[error("Invalid frame pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

/// Result type for frame discovery.
pub type FrameResult<T> = Result<T, FrameError>;

//! Data models for Multi-Channel Export.
//!
//! This module contains the core data structures used throughout the pipeline:
//! - Enums for frame formats, quality presets and policies
//! - Frame structures (frames, ordered sequences)
//! - Channel structures (loop specs, encode jobs, results)

mod enums;
mod frame;
mod jobs;

// Re-export all public types
pub use enums::{FrameFormat, IndexPolicy, QualityPreset, StageMode, ViewTransform};
pub use frame::{Frame, FrameSequence};
pub use jobs::{
    ChannelResult, ChannelSpec, EncodeJob, EncodeOverrides, EncodeParams, LoopSpec, RunSummary,
    DEFAULT_CODEC, DEFAULT_HOLD_FRAMES, DEFAULT_PIXEL_FORMAT, MAX_HOLD_FRAMES, MIN_HOLD_FRAMES,
};

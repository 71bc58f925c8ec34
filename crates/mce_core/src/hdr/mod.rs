//! Linear EXR to display-referred PNG conversion.
//!
//! Renderers write scene-linear EXR frames that an 8-bit video encoder
//! cannot consume directly. Each frame is decoded, pushed through a view
//! transform and the sRGB curve, and written as an 8-bit RGBA PNG into a
//! cache directory that survives across runs.

mod convert;
mod transform;

pub use convert::{convert_frames, convert_if_needed, ConversionReport, ConvertOptions};
pub use transform::{aces_filmic, display_encode, srgb_oetf};

use std::io;

use thiserror::Error;

/// Per-frame conversion errors. These never abort a whole conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    Encode { path: String, message: String },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;

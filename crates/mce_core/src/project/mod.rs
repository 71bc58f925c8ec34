//! Project output layout.
//!
//! A project root holds one frames directory and one output directory per
//! channel:
//!
//! ```text
//! Output/
//!   MobileFrames/   proj_0001.exr ...
//!   MobileOut/      proj.mp4
//!   DesktopFrames/
//!   DesktopOut/
//! ```

mod layout;

pub use layout::{channel_dir_stem, ProjectLayout, DEFAULT_CHANNELS};

//! MCE Core - frame sequence to video export pipeline.
//!
//! This crate contains all export logic with zero UI dependencies:
//! frame discovery, HDR conversion, timeline staging, encoder discovery
//! and invocation, and the per-channel orchestrator. It is used by the
//! `mce` command-line tool.

pub mod cancel;
pub mod config;
pub mod encoder;
pub mod frames;
pub mod hdr;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod project;
pub mod timeline;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

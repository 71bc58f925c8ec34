//! Configuration management for Multi-Channel Export.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use mce_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("mce.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Project root: {}", config.settings().paths.output_root);
//!
//! config.settings_mut().logging.compact = false;
//! config.update_section(ConfigSection::Logging).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, EncoderSettings, FrameSettings, HdrSettings, LoggingSettings, LoopSettings,
    PathSettings, Settings, StagingSettings,
};

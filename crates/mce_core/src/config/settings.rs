//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encoder::{DEFAULT_GOP_SIZE, DEFAULT_LEVEL, DEFAULT_PROFILE};
use crate::hdr::ConvertOptions;
use crate::logging::{LogConfig, LogLevel};
use crate::models::{
    ChannelSpec, IndexPolicy, LoopSpec, QualityPreset, StageMode, ViewTransform,
    DEFAULT_HOLD_FRAMES,
};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Encoder discovery and invocation.
    #[serde(default)]
    pub encoder: EncoderSettings,

    /// Default loop extension for new channels.
    #[serde(default, rename = "loop")]
    pub loop_defaults: LoopSettings,

    /// EXR conversion.
    #[serde(default)]
    pub hdr: HdrSettings,

    /// Frame discovery.
    #[serde(default)]
    pub frames: FrameSettings,

    /// Staging of renumbered frames.
    #[serde(default)]
    pub staging: StagingSettings,

    /// Output channels, rendered in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ChannelSpec>,
}

impl Settings {
    /// Configured channel by name (case-insensitive).
    pub fn channel(&self, name: &str) -> Option<&ChannelSpec> {
        self.channels
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Path configuration for project output, temp files and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Project root holding `<Channel>Frames/` and `<Channel>Out/`.
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Root folder for staging directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for per-channel log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Converted EXR cache; empty means `<temp_root>/hdr_cache`.
    #[serde(default)]
    pub hdr_cache: String,
}

fn default_output_root() -> String {
    "Output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
            hdr_cache: String::new(),
        }
    }
}

impl PathSettings {
    /// Cache directory for converted frames of `channel`.
    pub fn hdr_cache_dir(&self, channel: &str) -> PathBuf {
        let root = if self.hdr_cache.is_empty() {
            PathBuf::from(&self.temp_root).join("hdr_cache")
        } else {
            PathBuf::from(&self.hdr_cache)
        };
        root.join(channel)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to channel logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep encoder output out of the log unless a run fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of encoder output lines shown on failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prefix log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Log encoder options one per line.
    #[serde(default)]
    pub show_options_pretty: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
            show_options_pretty: false,
        }
    }
}

impl LoggingSettings {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            progress_step: self.progress_step,
            error_tail: self.error_tail as usize,
            show_timestamps: self.show_timestamps,
        }
    }
}

/// Encoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Explicit encoder executable; empty means search.
    #[serde(default)]
    pub path: String,

    /// Fail a channel when the encoder exits 0 without writing output.
    #[serde(default)]
    pub require_output: bool,

    /// Keyframe interval; 0 leaves the encoder default.
    #[serde(default = "default_gop_size")]
    pub gop_size: u32,

    /// H.264 profile for libx264; empty omits it.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// H.264 level for libx264; empty omits it.
    #[serde(default = "default_level")]
    pub level: String,

    /// Move the MP4 index to the front of the file.
    #[serde(default = "default_true")]
    pub faststart: bool,

    /// Quality preset for channels created by `setup`.
    #[serde(default)]
    pub default_quality: QualityPreset,

    /// Frame rate for channels created by `setup`.
    #[serde(default = "default_fps")]
    pub default_fps: u32,
}

fn default_gop_size() -> u32 {
    DEFAULT_GOP_SIZE
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_level() -> String {
    DEFAULT_LEVEL.to_string()
}

fn default_fps() -> u32 {
    30
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            require_output: false,
            gop_size: default_gop_size(),
            profile: default_profile(),
            level: default_level(),
            faststart: true,
            default_quality: QualityPreset::default(),
            default_fps: default_fps(),
        }
    }
}

impl EncoderSettings {
    pub fn explicit_path(&self) -> Option<PathBuf> {
        (!self.path.trim().is_empty()).then(|| PathBuf::from(self.path.trim()))
    }

    pub fn gop(&self) -> Option<u32> {
        (self.gop_size > 0).then_some(self.gop_size)
    }

    pub fn profile(&self) -> Option<String> {
        (!self.profile.is_empty()).then(|| self.profile.clone())
    }

    pub fn level(&self) -> Option<String> {
        (!self.level.is_empty()).then(|| self.level.clone())
    }
}

/// Loop defaults applied to new channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Frames held at each end, 1 to 120.
    #[serde(default = "default_hold_frames")]
    pub hold_frames: u32,
}

fn default_hold_frames() -> u32 {
    DEFAULT_HOLD_FRAMES
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            hold_frames: default_hold_frames(),
        }
    }
}

impl LoopSettings {
    pub fn loop_spec(&self) -> LoopSpec {
        LoopSpec {
            enabled: self.enabled,
            hold_frames: self.hold_frames,
        }
    }
}

/// EXR conversion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HdrSettings {
    /// Convert all-EXR sequences before staging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub view_transform: ViewTransform,

    /// Exposure adjustment in stops.
    #[serde(default)]
    pub exposure: f32,
}

impl Default for HdrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            view_transform: ViewTransform::default(),
            exposure: 0.0,
        }
    }
}

impl HdrSettings {
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            view_transform: self.view_transform,
            exposure: self.exposure,
        }
    }
}

/// Frame discovery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameSettings {
    /// What to do with frames whose index cannot be parsed.
    #[serde(default)]
    pub index_policy: IndexPolicy,
}

/// Staging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagingSettings {
    #[serde(default)]
    pub mode: StageMode,

    /// Run channels on separate threads.
    #[serde(default)]
    pub parallel: bool,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Encoder,
    Loop,
    Hdr,
    Frames,
    Staging,
    Channels,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 8] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Encoder,
        ConfigSection::Loop,
        ConfigSection::Hdr,
        ConfigSection::Frames,
        ConfigSection::Staging,
        ConfigSection::Channels,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Encoder => "encoder",
            ConfigSection::Loop => "loop",
            ConfigSection::Hdr => "hdr",
            ConfigSection::Frames => "frames",
            ConfigSection::Staging => "staging",
            ConfigSection::Channels => "channels",
        }
    }

    /// Comment written above the section in generated files.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Project, staging and log directories",
            ConfigSection::Logging => "Per-channel log files",
            ConfigSection::Encoder => "FFmpeg discovery and encode options",
            ConfigSection::Loop => "Loop defaults for new channels",
            ConfigSection::Hdr => "EXR to PNG conversion",
            ConfigSection::Frames => "Frame discovery",
            ConfigSection::Staging => "Staging of renumbered frames",
            ConfigSection::Channels => "Output channels",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[loop]"));
        assert!(toml.contains("output_root"));
        assert!(!toml.contains("[[channels]]"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[paths]\noutput_root = \"renders\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.paths.output_root, "renders");
        assert_eq!(parsed.paths.temp_root, ".temp");
        assert!(parsed.logging.compact);
        assert_eq!(parsed.encoder.gop_size, 18);
        assert_eq!(parsed.encoder.profile, "high");
        assert_eq!(parsed.loop_defaults.hold_frames, 15);
        assert_eq!(parsed.hdr.view_transform, ViewTransform::Filmic);
        assert_eq!(parsed.frames.index_policy, IndexPolicy::Lenient);
        assert_eq!(parsed.staging.mode, StageMode::Copy);
    }

    #[test]
    fn channels_parse_from_array_of_tables() {
        let src = r#"
            [[channels]]
            name = "mobile"
            base_name = "proj"
            fps = 24

            [[channels]]
            name = "desktop"
            base_name = "proj"
            quality = "high"
            [channels.loop]
            enabled = true
            hold_frames = 8
        "#;
        let parsed: Settings = toml::from_str(src).unwrap();
        assert_eq!(parsed.channels.len(), 2);
        assert_eq!(parsed.channel("Mobile").unwrap().fps, 24);
        let desktop = parsed.channel("desktop").unwrap();
        assert_eq!(desktop.quality, QualityPreset::High);
        assert!(desktop.loop_spec.enabled);
        assert!(desktop.frames_dir.is_none());
    }

    #[test]
    fn hdr_cache_defaults_under_temp_root() {
        let paths = PathSettings::default();
        assert_eq!(
            paths.hdr_cache_dir("mobile"),
            PathBuf::from(".temp").join("hdr_cache").join("mobile")
        );
    }

    #[test]
    fn encoder_optional_values() {
        let mut encoder = EncoderSettings::default();
        assert!(encoder.explicit_path().is_none());
        assert_eq!(encoder.gop(), Some(18));
        encoder.gop_size = 0;
        assert_eq!(encoder.level().as_deref(), Some("4.0"));
        encoder.profile.clear();
        encoder.level.clear();
        encoder.path = "/opt/ffmpeg/bin/ffmpeg".to_string();
        assert_eq!(encoder.gop(), None);
        assert_eq!(encoder.profile(), None);
        assert_eq!(encoder.level(), None);
        assert_eq!(
            encoder.explicit_path(),
            Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
        );
    }
}

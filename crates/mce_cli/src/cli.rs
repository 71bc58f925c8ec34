use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mce_core::models::{EncodeOverrides, QualityPreset};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mce.toml";

/// Export rendered frame sequences to video, one file per channel
#[derive(Parser, Debug)]
#[command(name = "mce", author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (created with defaults if missing)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (default: info, -v: debug, -vv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Export channels concurrently
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Write the run summary as JSON
    #[arg(long, value_name = "FILE", global = true)]
    pub summary: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the project directories and register the default channels
    Setup(SetupArgs),

    /// Export the named channels from the settings file
    Render {
        /// Channel names (e.g. mobile desktop)
        #[arg(required = true, value_name = "CHANNEL")]
        channels: Vec<String>,
    },

    /// Export every configured channel
    RenderAll,

    /// Export a single ad-hoc channel
    Encode(EncodeArgs),

    /// Print the encoder executable that would be used
    LocateEncoder,
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Project name; frames are expected as `<project>_<index>.<ext>`
    #[arg(long, value_name = "NAME")]
    pub project: String,

    /// Root directory holding the channel folders
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    /// Frames per second for the default channels
    #[arg(long, value_name = "N")]
    pub fps: Option<u32>,

    /// Quality preset for the default channels
    #[arg(long, value_enum)]
    pub quality: Option<QualityArg>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Directory containing the frames
    #[arg(long = "frames", value_name = "DIR")]
    pub frames_dir: PathBuf,

    /// Frame base name (files are `<base>_<index>.<ext>`)
    #[arg(long = "base", value_name = "NAME")]
    pub base_name: String,

    /// Output video file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: PathBuf,

    /// Channel name used for logs
    #[arg(long, default_value = "adhoc", value_name = "NAME")]
    pub name: String,

    /// Frames per second
    #[arg(long, value_name = "N")]
    pub fps: Option<u32>,

    /// Append a reversed copy with holds so the video loops seamlessly
    #[arg(long = "loop")]
    pub loop_enabled: bool,

    /// Frames to hold at each end of the loop
    #[arg(long = "hold", value_name = "N", requires = "loop_enabled")]
    pub hold_frames: Option<u32>,

    /// Quality preset
    #[arg(long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Constant rate factor, overrides the preset
    #[arg(long, value_name = "N")]
    pub crf: Option<u8>,

    /// Video codec, overrides libx264
    #[arg(long, value_name = "CODEC")]
    pub codec: Option<String>,

    /// Pixel format, overrides yuv420p
    #[arg(long = "pix-fmt", value_name = "FMT")]
    pub pixel_format: Option<String>,

    /// Encoder speed preset, overrides the quality preset's
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<String>,
}

impl EncodeArgs {
    pub fn overrides(&self) -> EncodeOverrides {
        EncodeOverrides {
            codec: self.codec.clone(),
            crf: self.crf,
            pixel_format: self.pixel_format.clone(),
            preset: self.preset.clone(),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityArg {
    High,
    Medium,
    Low,
}

impl From<QualityArg> for QualityPreset {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::High => QualityPreset::High,
            QualityArg::Medium => QualityPreset::Medium,
            QualityArg::Low => QualityPreset::Low,
        }
    }
}

//! Channel-related data structures (specs, encode jobs, results).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::QualityPreset;

/// Smallest allowed hold length.
pub const MIN_HOLD_FRAMES: u32 = 1;
/// Largest allowed hold length.
pub const MAX_HOLD_FRAMES: u32 = 120;
/// Hold length used when none is configured.
pub const DEFAULT_HOLD_FRAMES: u32 = 15;

/// Loop extension settings: forward, hold last, reverse, hold first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSpec {
    /// Whether to build the loop at all.
    #[serde(default)]
    pub enabled: bool,
    /// Frames to hold at each end, in `[1, 120]`.
    #[serde(default = "default_hold_frames")]
    pub hold_frames: u32,
}

fn default_hold_frames() -> u32 {
    DEFAULT_HOLD_FRAMES
}

impl Default for LoopSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            hold_frames: DEFAULT_HOLD_FRAMES,
        }
    }
}

impl LoopSpec {
    /// Loop disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Loop enabled with the given hold length.
    ///
    /// Fails when `hold_frames` is outside `[1, 120]`.
    pub fn looped(hold_frames: u32) -> Result<Self, String> {
        let spec = Self {
            enabled: true,
            hold_frames,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the hold bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_HOLD_FRAMES..=MAX_HOLD_FRAMES).contains(&self.hold_frames) {
            return Err(format!(
                "hold_frames must be between {} and {} (got {})",
                MIN_HOLD_FRAMES, MAX_HOLD_FRAMES, self.hold_frames
            ));
        }
        Ok(())
    }

    /// Staged length for a sequence of `n` frames.
    ///
    /// The loop only applies when there is more than one frame.
    pub fn timeline_len(&self, n: usize) -> usize {
        if self.enabled && n > 1 {
            2 * n + 2 * self.hold_frames as usize
        } else {
            n
        }
    }
}

/// Explicit per-field overrides of the quality preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl EncodeOverrides {
    pub fn is_empty(&self) -> bool {
        self.codec.is_none()
            && self.crf.is_none()
            && self.pixel_format.is_none()
            && self.preset.is_none()
    }
}

/// Widely compatible default video codec.
pub const DEFAULT_CODEC: &str = "libx264";
/// 4:2:0 chroma subsampling.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Fully resolved encoder quality parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeParams {
    pub codec: String,
    pub crf: u8,
    pub pixel_format: String,
    pub preset: String,
}

impl EncodeParams {
    /// Resolve a preset, letting each supplied override win.
    pub fn resolve(quality: QualityPreset, overrides: &EncodeOverrides) -> Self {
        Self {
            codec: overrides
                .codec
                .clone()
                .unwrap_or_else(|| DEFAULT_CODEC.to_string()),
            crf: overrides.crf.unwrap_or_else(|| quality.crf()),
            pixel_format: overrides
                .pixel_format
                .clone()
                .unwrap_or_else(|| DEFAULT_PIXEL_FORMAT.to_string()),
            preset: overrides
                .preset
                .clone()
                .unwrap_or_else(|| quality.speed().to_string()),
        }
    }
}

/// One encode request for a staged timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJob {
    /// Destination video file.
    pub output_path: PathBuf,
    /// Frames per second, always positive.
    pub fps: u32,
    /// Quality preset.
    pub quality: QualityPreset,
    /// Per-field overrides of the preset.
    pub overrides: EncodeOverrides,
    /// Keyframe interval, `None` leaves the encoder default.
    pub gop_size: Option<u32>,
}

impl EncodeJob {
    pub fn new(output_path: impl Into<PathBuf>, fps: u32, quality: QualityPreset) -> Self {
        Self {
            output_path: output_path.into(),
            fps,
            quality,
            overrides: EncodeOverrides::default(),
            gop_size: None,
        }
    }

    pub fn with_overrides(mut self, overrides: EncodeOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_gop_size(mut self, gop_size: Option<u32>) -> Self {
        self.gop_size = gop_size;
        self
    }

    /// Quality parameters after applying overrides.
    pub fn params(&self) -> EncodeParams {
        EncodeParams::resolve(self.quality, &self.overrides)
    }
}

/// Configuration of one output channel (e.g. "mobile", "desktop").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Channel name used in logs and results.
    pub name: String,
    /// Directory holding the rendered frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_dir: Option<PathBuf>,
    /// Frame filename stem, frames are `<base_name>_<index>.<ext>`.
    pub base_name: String,
    /// Destination video file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Frames per second.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Loop extension.
    #[serde(default, rename = "loop")]
    pub loop_spec: LoopSpec,
    /// Quality preset.
    #[serde(default)]
    pub quality: QualityPreset,
    /// Explicit encoder overrides.
    #[serde(default, skip_serializing_if = "EncodeOverrides::is_empty")]
    pub overrides: EncodeOverrides,
}

fn default_fps() -> u32 {
    30
}

impl ChannelSpec {
    pub fn new(
        name: impl Into<String>,
        frames_dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            frames_dir: Some(frames_dir.into()),
            base_name: base_name.into(),
            output_path: Some(output_path.into()),
            fps: default_fps(),
            loop_spec: LoopSpec::default(),
            quality: QualityPreset::default(),
            overrides: EncodeOverrides::default(),
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_loop(mut self, loop_spec: LoopSpec) -> Self {
        self.loop_spec = loop_spec;
        self
    }

    pub fn with_quality(mut self, quality: QualityPreset) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_overrides(mut self, overrides: EncodeOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Outcome of running one channel through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub channel_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Human-readable diagnostic.
    pub message: String,
    /// Frames discovered by the locator.
    #[serde(default)]
    pub frames_found: usize,
    /// Frames written to the staged timeline.
    #[serde(default)]
    pub frames_staged: usize,
    /// Size of the encoded file in bytes, if it was verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
}

impl ChannelResult {
    /// Create a successful result.
    pub fn success(
        channel_name: impl Into<String>,
        output_path: PathBuf,
        message: impl Into<String>,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            success: true,
            output_path: Some(output_path),
            message: message.into(),
            frames_found: 0,
            frames_staged: 0,
            output_size: None,
        }
    }

    /// Create a failed result.
    pub fn failure(channel_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            success: false,
            output_path: None,
            message: message.into(),
            frames_found: 0,
            frames_staged: 0,
            output_size: None,
        }
    }

    pub fn with_counts(mut self, found: usize, staged: usize) -> Self {
        self.frames_found = found;
        self.frames_staged = staged;
        self
    }

    pub fn with_output_size(mut self, size: Option<u64>) -> Self {
        self.output_size = size;
        self
    }
}

/// Aggregate result of a multi-channel run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub channels: Vec<ChannelResult>,
}

impl RunSummary {
    pub fn new(channels: Vec<ChannelResult>) -> Self {
        Self { channels }
    }

    /// The run succeeds when at least one channel succeeded.
    pub fn success(&self) -> bool {
        self.channels.iter().any(|c| c.success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ChannelResult> {
        self.channels.iter().filter(|c| c.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ChannelResult> {
        self.channels.iter().filter(|c| !c.success)
    }

    /// Look up a channel result by name.
    pub fn channel(&self, name: &str) -> Option<&ChannelResult> {
        self.channels.iter().find(|c| c.channel_name == name)
    }

    /// Write the summary as pretty JSON, replacing `path` atomically.
    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;

        let temp_file = path.with_extension("json.tmp");
        fs::write(&temp_file, &json)?;
        fs::rename(&temp_file, path)?;

        tracing::debug!("Saved run summary to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_spec_bounds() {
        assert!(LoopSpec::looped(0).is_err());
        assert!(LoopSpec::looped(121).is_err());
        assert!(LoopSpec::looped(1).is_ok());
        assert!(LoopSpec::looped(120).is_ok());
        assert_eq!(LoopSpec::default().hold_frames, 15);
        assert!(!LoopSpec::default().enabled);
    }

    #[test]
    fn timeline_len_follows_loop_shape() {
        let looped = LoopSpec::looped(3).unwrap();
        assert_eq!(looped.timeline_len(5), 16);
        assert_eq!(looped.timeline_len(1), 1);
        assert_eq!(looped.timeline_len(0), 0);
        assert_eq!(LoopSpec::disabled().timeline_len(5), 5);
    }

    #[test]
    fn overrides_win_over_preset() {
        let params = EncodeParams::resolve(QualityPreset::High, &EncodeOverrides::default());
        assert_eq!(params.codec, "libx264");
        assert_eq!(params.crf, 18);
        assert_eq!(params.pixel_format, "yuv420p");
        assert_eq!(params.preset, "slow");

        let overrides = EncodeOverrides {
            crf: Some(30),
            codec: Some("libx265".to_string()),
            ..Default::default()
        };
        let params = EncodeParams::resolve(QualityPreset::High, &overrides);
        assert_eq!(params.crf, 30);
        assert_eq!(params.codec, "libx265");
        assert_eq!(params.preset, "slow");
    }

    #[test]
    fn run_summary_succeeds_if_any_channel_does() {
        let summary = RunSummary::new(vec![
            ChannelResult::failure("mobile", "no frames found"),
            ChannelResult::success("desktop", PathBuf::from("/out/d.mp4"), "ok"),
        ]);
        assert!(summary.success());
        assert_eq!(summary.failed().count(), 1);

        let all_failed = RunSummary::new(vec![
            ChannelResult::failure("mobile", "x"),
            ChannelResult::failure("desktop", "y"),
        ]);
        assert!(!all_failed.success());
        assert!(!RunSummary::default().success());
    }

    #[test]
    fn run_summary_saves_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("summary.json");
        let summary = RunSummary::new(vec![ChannelResult::success(
            "mobile",
            PathBuf::from("/out/m.mp4"),
            "Encoded 8 frame(s)",
        )
        .with_counts(8, 8)]);

        summary.save_json(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded: RunSummary =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, summary);
    }

    #[test]
    fn channel_spec_reads_loop_table() {
        let toml_src = r#"
            name = "mobile"
            frames_dir = "/render/MobileFrames"
            base_name = "proj"
            output_path = "/render/MobileOut/proj.mp4"
            fps = 24
            quality = "high"

            [loop]
            enabled = true
            hold_frames = 10
        "#;
        let spec: ChannelSpec = toml::from_str(toml_src).unwrap();
        assert_eq!(spec.fps, 24);
        assert_eq!(spec.quality, QualityPreset::High);
        assert!(spec.loop_spec.enabled);
        assert_eq!(spec.loop_spec.hold_frames, 10);
        assert!(spec.overrides.is_empty());
    }
}

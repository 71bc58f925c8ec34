//! Encoder command-line builder.
//!
//! Builds the token list for an image-sequence encode:
//!
//! ```text
//! -y -framerate <fps> -i <dir>/frame_%04d.<ext>
//!    -c:v <codec> -preset <speed> -crf <crf> -pix_fmt <fmt>
//!    [-profile:v high -level:v 4.0] [-g <gop>]
//!    -vf scale=trunc(iw/2)*2:trunc(ih/2)*2 -movflags +faststart <output>
//! ```

use std::path::Path;

use crate::models::{EncodeJob, DEFAULT_CODEC};

/// Keyframe interval used when nothing else is configured.
pub const DEFAULT_GOP_SIZE: u32 = 18;

/// H.264 profile, only passed to libx264.
pub const DEFAULT_PROFILE: &str = "high";

/// H.264 level, only passed to libx264. 4.0 covers 1080p30 on most players.
pub const DEFAULT_LEVEL: &str = "4.0";

/// Rounds odd frame dimensions down to even, which 4:2:0 output requires.
pub const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Builder for encoder command-line tokens.
pub struct FfmpegArgsBuilder<'a> {
    input_pattern: &'a Path,
    job: &'a EncodeJob,
    profile: Option<&'a str>,
    level: Option<&'a str>,
    faststart: bool,
}

impl<'a> FfmpegArgsBuilder<'a> {
    pub fn new(input_pattern: &'a Path, job: &'a EncodeJob) -> Self {
        Self {
            input_pattern,
            job,
            profile: Some(DEFAULT_PROFILE),
            level: Some(DEFAULT_LEVEL),
            faststart: true,
        }
    }

    /// Override the H.264 profile, `None` omits it.
    pub fn with_profile(mut self, profile: Option<&'a str>) -> Self {
        self.profile = profile;
        self
    }

    /// Override the H.264 level, `None` omits it.
    pub fn with_level(mut self, level: Option<&'a str>) -> Self {
        self.level = level;
        self
    }

    /// Toggle moving the index to the front of the file.
    pub fn with_faststart(mut self, faststart: bool) -> Self {
        self.faststart = faststart;
        self
    }

    pub fn build(&self) -> Vec<String> {
        let params = self.job.params();
        let mut tokens = Vec::with_capacity(24);

        tokens.push("-y".to_string());
        tokens.push("-framerate".to_string());
        tokens.push(self.job.fps.to_string());
        tokens.push("-i".to_string());
        tokens.push(self.input_pattern.to_string_lossy().to_string());

        tokens.push("-c:v".to_string());
        tokens.push(params.codec.clone());
        tokens.push("-preset".to_string());
        tokens.push(params.preset.clone());
        tokens.push("-crf".to_string());
        tokens.push(params.crf.to_string());
        tokens.push("-pix_fmt".to_string());
        tokens.push(params.pixel_format.clone());

        // Other codecs reject H.264 profile and level names
        if params.codec == DEFAULT_CODEC {
            if let Some(profile) = self.profile {
                tokens.push("-profile:v".to_string());
                tokens.push(profile.to_string());
            }
            if let Some(level) = self.level {
                tokens.push("-level:v".to_string());
                tokens.push(level.to_string());
            }
        }

        if let Some(gop) = self.job.gop_size.filter(|g| *g > 0) {
            tokens.push("-g".to_string());
            tokens.push(gop.to_string());
        }

        tokens.push("-vf".to_string());
        tokens.push(EVEN_DIMENSIONS_FILTER.to_string());

        if self.faststart {
            tokens.push("-movflags".to_string());
            tokens.push("+faststart".to_string());
        }

        tokens.push(self.job.output_path.to_string_lossy().to_string());
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EncodeOverrides, QualityPreset};
    use std::path::PathBuf;

    fn value_after<'t>(tokens: &'t [String], flag: &str) -> Option<&'t str> {
        tokens
            .iter()
            .position(|t| t == flag)
            .and_then(|i| tokens.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn medium_preset_defaults() {
        let pattern = PathBuf::from("/tmp/stage/frame_%04d.png");
        let job = EncodeJob::new("/out/video.mp4", 24, QualityPreset::Medium)
            .with_gop_size(Some(DEFAULT_GOP_SIZE));
        let tokens = FfmpegArgsBuilder::new(&pattern, &job).build();

        assert_eq!(tokens[0], "-y");
        assert_eq!(value_after(&tokens, "-framerate"), Some("24"));
        assert_eq!(value_after(&tokens, "-i"), Some("/tmp/stage/frame_%04d.png"));
        assert_eq!(value_after(&tokens, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&tokens, "-preset"), Some("medium"));
        assert_eq!(value_after(&tokens, "-crf"), Some("23"));
        assert_eq!(value_after(&tokens, "-pix_fmt"), Some("yuv420p"));
        assert_eq!(value_after(&tokens, "-profile:v"), Some("high"));
        assert_eq!(value_after(&tokens, "-level:v"), Some("4.0"));
        assert_eq!(value_after(&tokens, "-g"), Some("18"));
        assert_eq!(value_after(&tokens, "-vf"), Some(EVEN_DIMENSIONS_FILTER));
        assert_eq!(value_after(&tokens, "-movflags"), Some("+faststart"));
        assert_eq!(tokens.last().map(String::as_str), Some("/out/video.mp4"));
    }

    #[test]
    fn overrides_win_and_drop_profile_for_other_codecs() {
        let pattern = PathBuf::from("frame_%04d.png");
        let job = EncodeJob::new("out.webm", 30, QualityPreset::High).with_overrides(
            EncodeOverrides {
                codec: Some("libvpx-vp9".to_string()),
                crf: Some(31),
                pixel_format: None,
                preset: Some("veryslow".to_string()),
            },
        );
        let tokens = FfmpegArgsBuilder::new(&pattern, &job).build();

        assert_eq!(value_after(&tokens, "-c:v"), Some("libvpx-vp9"));
        assert_eq!(value_after(&tokens, "-crf"), Some("31"));
        assert_eq!(value_after(&tokens, "-preset"), Some("veryslow"));
        assert!(!tokens.iter().any(|t| t == "-profile:v" || t == "-level:v"));
        assert!(!tokens.iter().any(|t| t == "-g"));
    }

    #[test]
    fn optional_flags_can_be_disabled() {
        let pattern = PathBuf::from("frame_%04d.png");
        let job = EncodeJob::new("out.mp4", 12, QualityPreset::Low);
        let tokens = FfmpegArgsBuilder::new(&pattern, &job)
            .with_profile(None)
            .with_level(Some("3.1"))
            .with_faststart(false)
            .build();

        assert_eq!(value_after(&tokens, "-crf"), Some("28"));
        assert_eq!(value_after(&tokens, "-preset"), Some("fast"));
        assert!(!tokens.iter().any(|t| t == "-profile:v" || t == "-movflags"));
        assert_eq!(value_after(&tokens, "-level:v"), Some("3.1"));
    }
}

//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Still-image formats recognised in a frames directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    Png,
    Jpeg,
    /// Linear-light, high-dynamic-range OpenEXR.
    Exr,
    Tiff,
}

impl FrameFormat {
    /// Every extension the frame locator searches for, lowercase.
    pub const EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg", "exr", "tif", "tiff"];

    /// Map a file extension (any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "exr" => Some(Self::Exr),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Whether frames of this format need a display transform before encoding.
    pub fn is_linear_hdr(&self) -> bool {
        matches!(self, Self::Exr)
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameFormat::Png => write!(f, "PNG"),
            FrameFormat::Jpeg => write!(f, "JPEG"),
            FrameFormat::Exr => write!(f, "EXR"),
            FrameFormat::Tiff => write!(f, "TIFF"),
        }
    }
}

/// Encoding quality preset.
///
/// Each preset maps to a fixed CRF and encoder speed preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    High,
    #[default]
    Medium,
    Low,
}

impl QualityPreset {
    /// Constant rate factor for this preset.
    pub fn crf(&self) -> u8 {
        match self {
            Self::High => 18,
            Self::Medium => 23,
            Self::Low => 28,
        }
    }

    /// Encoder speed preset for this quality.
    pub fn speed(&self) -> &'static str {
        match self {
            Self::High => "slow",
            Self::Medium => "medium",
            Self::Low => "fast",
        }
    }

}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityPreset::High => write!(f, "high"),
            QualityPreset::Medium => write!(f, "medium"),
            QualityPreset::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!(
                "unknown quality preset '{}' (expected high, medium or low)",
                other
            )),
        }
    }
}

/// How to treat a frame file whose name carries no parseable index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPolicy {
    /// Keep the frame with index 0 and log a warning.
    #[default]
    Lenient,
    /// Fail discovery for the whole channel.
    Strict,
}

/// Display transform applied when converting linear EXR frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewTransform {
    /// Clamp to [0, 1] then sRGB encode.
    Standard,
    /// Filmic tone curve (ACES fit) then sRGB encode.
    #[default]
    Filmic,
}

impl std::fmt::Display for ViewTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewTransform::Standard => write!(f, "standard"),
            ViewTransform::Filmic => write!(f, "filmic"),
        }
    }
}

/// How frames are materialised into the staging directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMode {
    /// Full byte copy of each frame.
    #[default]
    Copy,
    /// Hard link when the filesystem allows it, copy otherwise.
    HardLink,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_format_from_extension_ignores_case() {
        assert_eq!(FrameFormat::from_extension("PNG"), Some(FrameFormat::Png));
        assert_eq!(FrameFormat::from_extension("jpeg"), Some(FrameFormat::Jpeg));
        assert_eq!(FrameFormat::from_extension("Tif"), Some(FrameFormat::Tiff));
        assert_eq!(FrameFormat::from_extension("mov"), None);
    }

    #[test]
    fn only_exr_is_linear() {
        assert!(FrameFormat::Exr.is_linear_hdr());
        assert!(!FrameFormat::Png.is_linear_hdr());
    }

    #[test]
    fn quality_presets_map_to_fixed_parameters() {
        assert_eq!(QualityPreset::High.crf(), 18);
        assert_eq!(QualityPreset::High.speed(), "slow");
        assert_eq!(QualityPreset::Medium.crf(), 23);
        assert_eq!(QualityPreset::Medium.speed(), "medium");
        assert_eq!(QualityPreset::Low.crf(), 28);
        assert_eq!(QualityPreset::Low.speed(), "fast");
    }

    #[test]
    fn quality_preset_parses_and_serializes_lowercase() {
        assert_eq!("HIGH".parse::<QualityPreset>().unwrap(), QualityPreset::High);
        assert!("ultra".parse::<QualityPreset>().is_err());
        let json = serde_json::to_string(&QualityPreset::Low).unwrap();
        assert_eq!(json, "\"low\"");
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::{ChannelSpec, LoopSpec, QualityPreset};

/// Channels created by `setup`.
pub const DEFAULT_CHANNELS: [&str; 2] = ["mobile", "desktop"];

/// Container used for channel outputs.
const OUTPUT_EXTENSION: &str = "mp4";

/// Directory stem for a channel: `mobile` -> `Mobile`.
pub fn channel_dir_stem(channel: &str) -> String {
    let mut chars = channel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Directory conventions under a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<Channel>Frames`
    pub fn frames_dir(&self, channel: &str) -> PathBuf {
        self.root
            .join(format!("{}Frames", channel_dir_stem(channel)))
    }

    /// `<root>/<Channel>Out`
    pub fn output_dir(&self, channel: &str) -> PathBuf {
        self.root.join(format!("{}Out", channel_dir_stem(channel)))
    }

    /// `<root>/<Channel>Out/<project>.mp4`
    pub fn output_file(&self, channel: &str, project: &str) -> PathBuf {
        self.output_dir(channel)
            .join(format!("{}.{}", project, OUTPUT_EXTENSION))
    }

    /// Fill in a channel's missing directories from the layout.
    pub fn resolve(&self, spec: &ChannelSpec) -> ChannelSpec {
        let mut resolved = spec.clone();
        if resolved.frames_dir.is_none() {
            resolved.frames_dir = Some(self.frames_dir(&spec.name));
        }
        if resolved.output_path.is_none() {
            resolved.output_path = Some(self.output_file(&spec.name, &spec.base_name));
        }
        resolved
    }

    /// Create the frames and output directories of `channels`.
    ///
    /// Returns the directories that did not exist before.
    pub fn create_dirs(&self, channels: &[&str]) -> io::Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for channel in channels {
            for dir in [self.frames_dir(channel), self.output_dir(channel)] {
                if !dir.is_dir() {
                    fs::create_dir_all(&dir)?;
                    tracing::info!("Created directory: {}", dir.display());
                    created.push(dir);
                }
            }
        }
        Ok(created)
    }

    /// Channel specs for the default channels of `project`.
    ///
    /// Frames are expected as `<project>_<index>.<ext>`.
    pub fn default_channels(
        &self,
        project: &str,
        fps: u32,
        quality: QualityPreset,
        loop_spec: LoopSpec,
    ) -> Vec<ChannelSpec> {
        DEFAULT_CHANNELS
            .iter()
            .map(|name| {
                ChannelSpec::new(
                    *name,
                    self.frames_dir(name),
                    project,
                    self.output_file(name, project),
                )
                .with_fps(fps)
                .with_quality(quality)
                .with_loop(loop_spec)
            })
            .collect()
    }
}

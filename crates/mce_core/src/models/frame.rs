//! Frame and frame sequence structures.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::FrameFormat;

/// A single rendered still image with its parsed frame index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame index parsed from the filename tail.
    pub index: u64,
    /// Location on disk.
    pub path: PathBuf,
}

impl Frame {
    pub fn new(index: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            path: path.into(),
        }
    }

    /// File extension exactly as written on disk.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// Recognised image format, if the extension is one we handle.
    pub fn format(&self) -> Option<FrameFormat> {
        self.extension().and_then(FrameFormat::from_extension)
    }

    /// File name used as the tie-breaker when indices collide.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Frames ordered ascending by index.
///
/// Duplicate indices are allowed; ties are ordered by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    /// Build a sequence, sorting by `(index, file name)`.
    pub fn new(mut frames: Vec<Frame>) -> Self {
        frames.sort_by(|a, b| {
            a.index
                .cmp(&b.index)
                .then_with(|| a.file_name().cmp(b.file_name()))
        });
        Self { frames }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Paths in sequence order.
    pub fn paths(&self) -> Vec<&Path> {
        self.frames.iter().map(|f| f.path.as_path()).collect()
    }

    /// Distinct formats present in the sequence.
    pub fn formats(&self) -> BTreeSet<FrameFormat> {
        self.frames.iter().filter_map(Frame::format).collect()
    }

    /// True when every frame is linear HDR and conversion applies.
    pub fn is_all_hdr(&self) -> bool {
        !self.frames.is_empty()
            && self
                .frames
                .iter()
                .all(|f| f.format().is_some_and(|fmt| fmt.is_linear_hdr()))
    }

    /// The lowercase extension shared by all frames, or `None` when they differ.
    ///
    /// The encoder input pattern names a single extension, so a mixed
    /// sequence cannot be staged as one timeline.
    pub fn single_extension(&self) -> Option<String> {
        let mut exts = self
            .frames
            .iter()
            .map(|f| f.extension().unwrap_or_default().to_ascii_lowercase());
        let first = exts.next()?;
        if exts.all(|e| e == first) {
            Some(first)
        } else {
            None
        }
    }

    /// Distinct lowercase extensions, for diagnostics.
    pub fn extensions(&self) -> BTreeSet<String> {
        self.frames
            .iter()
            .map(|f| f.extension().unwrap_or_default().to_ascii_lowercase())
            .collect()
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

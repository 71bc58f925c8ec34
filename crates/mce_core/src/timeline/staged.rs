//! Scoped staging directory holding the renumbered frames.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Filename prefix of every staged frame.
pub const STAGED_PREFIX: &str = "frame_";

/// Contiguous, 1-based renumbered frames in a temporary directory.
///
/// Owns its directory: dropping the timeline deletes it and every staged
/// file, whichever way the owning run ends.
#[derive(Debug)]
pub struct StagedTimeline {
    dir: TempDir,
    files: Vec<PathBuf>,
    extension: String,
    padding: usize,
}

impl StagedTimeline {
    pub(crate) fn new(dir: TempDir, files: Vec<PathBuf>, extension: String, padding: usize) -> Self {
        Self {
            dir,
            files,
            extension,
            padding,
        }
    }

    /// Staging directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of staged frames.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Staged files in timeline order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Lowercase extension shared by all staged frames.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Zero-pad width of the frame numbers (at least 4).
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Staged file name for a 1-based position.
    pub fn file_name(position: usize, padding: usize, extension: &str) -> String {
        format!(
            "{}{:0width$}.{}",
            STAGED_PREFIX,
            position,
            extension,
            width = padding
        )
    }

    /// printf-style input pattern, e.g. `<dir>/frame_%04d.png`.
    pub fn input_pattern(&self) -> PathBuf {
        self.dir.path().join(format!(
            "{}%0{}d.{}",
            STAGED_PREFIX, self.padding, self.extension
        ))
    }

    /// Remove the staging directory now, reporting any error.
    ///
    /// Dropping the timeline does the same but swallows failures.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!("Removed staging directory {}", path.display());
        Ok(())
    }
}

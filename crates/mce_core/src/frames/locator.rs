//! Directory scan and frame index parsing.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::{MatchOptions, Pattern};
use regex::Regex;

use super::{FrameError, FrameResult};
use crate::models::{Frame, FrameFormat, FrameSequence, IndexPolicy};

/// Last `_<digits>.` run before the final extension.
static INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)\.[^.]*$").expect("static regex is valid"));

/// Extensions match in any case; the base name is re-checked exactly.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Parse the frame index from a filename such as `clip_0042.png`.
///
/// Returns `None` when the name has no `_<digits>.<ext>` tail or the
/// digits overflow `u64`.
pub fn parse_frame_index(file_name: &str) -> Option<u64> {
    INDEX_RE
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Find frames named `<base_name>_<index>.<ext>` in `directory`.
///
/// Unparseable indices fall back to 0. A missing directory or no matches
/// yields an empty sequence.
pub fn find_frames(directory: &Path, base_name: &str) -> FrameSequence {
    match find_frames_with(directory, base_name, IndexPolicy::Lenient) {
        Ok(frames) => frames,
        Err(e) => {
            tracing::warn!("Frame discovery in {} failed: {}", directory.display(), e);
            FrameSequence::empty()
        }
    }
}

/// Find frames with an explicit policy for unparseable indices.
pub fn find_frames_with(
    directory: &Path,
    base_name: &str,
    policy: IndexPolicy,
) -> FrameResult<FrameSequence> {
    if !directory.is_dir() {
        tracing::debug!("Frames directory does not exist: {}", directory.display());
        return Ok(FrameSequence::empty());
    }

    let candidates = collect_candidates(directory, base_name)?;
    let mut frames = Vec::with_capacity(candidates.len());

    for path in candidates {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let index = match parse_frame_index(&file_name) {
            Some(index) => index,
            None => match policy {
                IndexPolicy::Lenient => {
                    tracing::warn!(
                        "No frame index in '{}', placing it at index 0",
                        file_name
                    );
                    0
                }
                IndexPolicy::Strict => {
                    return Err(FrameError::Discovery {
                        path: path.display().to_string(),
                    });
                }
            },
        };

        frames.push(Frame::new(index, path));
    }

    let sequence = FrameSequence::new(frames);
    tracing::debug!(
        "Found {} frame(s) for '{}' in {} (formats: {:?})",
        sequence.len(),
        base_name,
        directory.display(),
        sequence.formats()
    );
    Ok(sequence)
}

/// Union of glob matches across every recognised extension.
fn collect_candidates(directory: &Path, base_name: &str) -> FrameResult<BTreeSet<PathBuf>> {
    let dir = Pattern::escape(&directory.to_string_lossy());
    let base = Pattern::escape(base_name);
    let prefix = format!("{}_", base_name);
    let mut found = BTreeSet::new();

    for ext in FrameFormat::EXTENSIONS {
        let pattern = Path::new(&dir)
            .join(format!("{}_*.{}", base, ext))
            .to_string_lossy()
            .to_string();

        let paths = glob::glob_with(&pattern, MATCH_OPTIONS).map_err(|e| FrameError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in paths {
            match entry {
                Ok(path) if path.is_file() && has_exact_prefix(&path, &prefix) => {
                    found.insert(path);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
            }
        }
    }

    Ok(found)
}

fn has_exact_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(prefix))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }

    #[test]
    fn parses_last_digit_run_before_extension() {
        assert_eq!(parse_frame_index("clip_001.png"), Some(1));
        assert_eq!(parse_frame_index("shot_12_0042.exr"), Some(42));
        assert_eq!(parse_frame_index("clip_final.png"), None);
        assert_eq!(parse_frame_index("clip001.png"), None);
        assert_eq!(parse_frame_index("clip_99999999999999999999999.png"), None);
    }

    #[test]
    fn orders_numerically_regardless_of_listing() {
        let dir = tempdir().unwrap();
        // Written out of order, and 10 sorts before 2 lexically
        for i in [7, 10, 1, 3, 9, 2, 8, 5, 4, 6] {
            touch(dir.path(), &format!("clip_{:03}.png", i));
        }
        touch(dir.path(), "other_001.png");
        touch(dir.path(), "clip_001.txt");

        let frames = find_frames(dir.path(), "clip");
        assert_eq!(frames.len(), 10);
        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, (1..=10).collect::<Vec<u64>>());
    }

    #[test]
    fn unions_all_extensions_case_insensitively() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "proj_1.png");
        touch(dir.path(), "proj_2.JPG");
        touch(dir.path(), "proj_3.jpeg");
        touch(dir.path(), "proj_4.exr");
        touch(dir.path(), "proj_5.tif");
        touch(dir.path(), "proj_6.tiff");

        let frames = find_frames(dir.path(), "proj");
        assert_eq!(frames.len(), 6);
        assert_eq!(frames.last().unwrap().index, 6);
    }

    #[test]
    fn base_name_case_must_match() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "clip_001.PNG");
        touch(dir.path(), "Clip_002.png");
        touch(dir.path(), "CLIP_003.png");

        let frames = find_frames(dir.path(), "clip");
        let names: Vec<&str> = frames.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["clip_001.PNG"]);
    }

    #[test]
    fn missing_directory_is_empty_not_error() {
        let frames = find_frames(Path::new("/nonexistent/frames/dir"), "clip");
        assert!(frames.is_empty());
    }

    #[test]
    fn lenient_policy_places_unparseable_first() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "clip_0002.png");
        touch(dir.path(), "clip_beauty.png");
        touch(dir.path(), "clip_0001.png");

        let frames = find_frames(dir.path(), "clip");
        assert_eq!(frames.len(), 3);
        assert_eq!(frames.first().unwrap().index, 0);
        assert_eq!(frames.first().unwrap().file_name(), "clip_beauty.png");
    }

    #[test]
    fn strict_policy_rejects_unparseable() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "clip_0001.png");
        touch(dir.path(), "clip_beauty.png");

        let result = find_frames_with(dir.path(), "clip", IndexPolicy::Strict);
        assert!(matches!(result, Err(FrameError::Discovery { .. })));
    }

    #[test]
    fn duplicate_indices_tie_break_by_name() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "clip_01.png");
        touch(dir.path(), "clip_1.png");

        let frames = find_frames(dir.path(), "clip");
        let names: Vec<&str> = frames.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["clip_01.png", "clip_1.png"]);
    }

    #[test]
    fn base_name_with_glob_characters_is_literal() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "shot[a]_001.png");
        touch(dir.path(), "shota_001.png");

        let frames = find_frames(dir.path(), "shot[a]");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames.first().unwrap().file_name(), "shot[a]_001.png");
    }
}

//! Timeline planning and materialisation.

use std::fs;
use std::path::Path;

use super::staged::StagedTimeline;
use super::{TimelineError, TimelineResult};
use crate::models::{FrameSequence, LoopSpec, StageMode};

/// Minimum zero-pad width of staged frame numbers.
const MIN_PADDING: usize = 4;

/// Source frame positions (0-based) in timeline order.
///
/// Non-loop: `0..n`. Loop with `n > 1`: forward, last frame `hold` times,
/// reverse, first frame `hold` times. A single frame never loops.
pub fn plan_timeline(n: usize, loop_spec: &LoopSpec) -> Vec<usize> {
    if !loop_spec.enabled || n <= 1 {
        return (0..n).collect();
    }

    let hold = loop_spec.hold_frames as usize;
    let mut order = Vec::with_capacity(loop_spec.timeline_len(n));
    order.extend(0..n);
    order.extend(std::iter::repeat(n - 1).take(hold));
    order.extend((0..n).rev());
    order.extend(std::iter::repeat(0).take(hold));
    order
}

/// Stage `frames` into a fresh temporary directory under `staging_root`
/// by copying each file.
pub fn build_timeline(
    frames: &FrameSequence,
    loop_spec: &LoopSpec,
    staging_root: &Path,
) -> TimelineResult<StagedTimeline> {
    build_timeline_with(frames, loop_spec, staging_root, StageMode::Copy)
}

/// Stage `frames` with an explicit materialisation mode.
pub fn build_timeline_with(
    frames: &FrameSequence,
    loop_spec: &LoopSpec,
    staging_root: &Path,
    mode: StageMode,
) -> TimelineResult<StagedTimeline> {
    if frames.is_empty() {
        return Err(TimelineError::EmptyInput);
    }

    let extension = frames.single_extension().ok_or_else(|| {
        let exts: Vec<String> = frames.extensions().into_iter().collect();
        TimelineError::MixedExtensions(exts.join(", "))
    })?;

    if loop_spec.enabled && frames.len() <= 1 {
        tracing::info!("Loop requested for a single frame, staging it without a loop");
    }

    let order = plan_timeline(frames.len(), loop_spec);
    let padding = MIN_PADDING.max(order.len().to_string().len());

    fs::create_dir_all(staging_root)
        .map_err(|e| TimelineError::staging("creating staging root", e))?;
    let dir = tempfile::Builder::new()
        .prefix("mce_stage_")
        .tempdir_in(staging_root)
        .map_err(|e| TimelineError::staging("creating staging directory", e))?;

    let sources = frames.frames();
    let mut files = Vec::with_capacity(order.len());

    for (position, &source_idx) in order.iter().enumerate() {
        let source = &sources[source_idx].path;
        let name = StagedTimeline::file_name(position + 1, padding, &extension);
        let dest = dir.path().join(name);

        stage_file(source, &dest, mode).map_err(|e| {
            TimelineError::staging(format!("staging {}", source.display()), e)
        })?;
        files.push(dest);
    }

    tracing::debug!(
        "Staged {} frame(s) from {} source(s) into {}",
        files.len(),
        frames.len(),
        dir.path().display()
    );

    Ok(StagedTimeline::new(dir, files, extension, padding))
}

fn stage_file(source: &Path, dest: &Path, mode: StageMode) -> std::io::Result<()> {
    match mode {
        StageMode::Copy => fs::copy(source, dest).map(|_| ()),
        StageMode::HardLink => fs::hard_link(source, dest).or_else(|e| {
            tracing::debug!("Hard link failed ({}), copying {}", e, source.display());
            fs::copy(source, dest).map(|_| ())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frame;
    use sha2::{Digest, Sha256};
    use tempfile::tempdir;

    fn make_frames(dir: &Path, n: usize, ext: &str) -> FrameSequence {
        let frames = (1..=n)
            .map(|i| {
                let path = dir.join(format!("clip_{:03}.{}", i, ext));
                fs::write(&path, format!("frame content {}", i)).unwrap();
                Frame::new(i as u64, path)
            })
            .collect();
        FrameSequence::new(frames)
    }

    fn digest(path: &Path) -> Vec<u8> {
        Sha256::digest(fs::read(path).unwrap()).to_vec()
    }

    #[test]
    fn plan_without_loop_is_identity() {
        assert_eq!(plan_timeline(4, &LoopSpec::disabled()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn plan_with_loop_has_four_segments() {
        let spec = LoopSpec::looped(2).unwrap();
        assert_eq!(
            plan_timeline(3, &spec),
            vec![0, 1, 2, 2, 2, 2, 1, 0, 0, 0]
        );
    }

    #[test]
    fn plan_single_frame_never_loops() {
        let spec = LoopSpec::looped(5).unwrap();
        assert_eq!(plan_timeline(1, &spec), vec![0]);
        assert!(plan_timeline(0, &spec).is_empty());
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let root = tempdir().unwrap();
        let result = build_timeline(&FrameSequence::empty(), &LoopSpec::disabled(), root.path());
        assert!(matches!(result, Err(TimelineError::EmptyInput)));
    }

    #[test]
    fn non_loop_stages_contiguous_frames() {
        let src = tempdir().unwrap();
        let root = tempdir().unwrap();
        let frames = make_frames(src.path(), 7, "png");

        let staged = build_timeline(&frames, &LoopSpec::disabled(), root.path()).unwrap();
        assert_eq!(staged.len(), 7);
        for i in 1..=7 {
            let path = staged.path().join(format!("frame_{:04}.png", i));
            assert!(path.exists(), "missing {}", path.display());
        }
        let count = fs::read_dir(staged.path()).unwrap().count();
        assert_eq!(count, 7);
    }

    #[test]
    fn loop_stages_holds_and_reverse() {
        let src = tempdir().unwrap();
        let root = tempdir().unwrap();
        let frames = make_frames(src.path(), 5, "png");

        let staged =
            build_timeline(&frames, &LoopSpec::looped(3).unwrap(), root.path()).unwrap();
        assert_eq!(staged.len(), 16);
        assert_eq!(fs::read_dir(staged.path()).unwrap().count(), 16);

        let files = staged.files();
        let first = digest(&frames.frames()[0].path);
        let last = digest(&frames.frames()[4].path);

        // Hold last: positions 6-8
        for file in &files[5..8] {
            assert_eq!(digest(file), last);
        }
        // Reverse pass: positions 9-13 are frames 5..1
        for (offset, file) in files[8..13].iter().enumerate() {
            assert_eq!(digest(file), digest(&frames.frames()[4 - offset].path));
        }
        // Hold first: positions 14-16
        for file in &files[13..16] {
            assert_eq!(digest(file), first);
        }
    }

    #[test]
    fn single_frame_loop_falls_back() {
        let src = tempdir().unwrap();
        let root = tempdir().unwrap();
        let frames = make_frames(src.path(), 1, "png");

        let staged =
            build_timeline(&frames, &LoopSpec::looped(10).unwrap(), root.path()).unwrap();
        assert_eq!(staged.len(), 1);
        assert!(staged.path().join("frame_0001.png").exists());
    }

    #[test]
    fn mixed_extensions_are_rejected() {
        let src = tempdir().unwrap();
        let root = tempdir().unwrap();
        let a = src.path().join("clip_1.png");
        let b = src.path().join("clip_2.jpg");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let frames = FrameSequence::new(vec![Frame::new(1, a), Frame::new(2, b)]);

        let result = build_timeline(&frames, &LoopSpec::disabled(), root.path());
        assert!(matches!(result, Err(TimelineError::MixedExtensions(_))));
    }

    #[test]
    fn staging_directory_removed_on_drop() {
        let src = tempdir().unwrap();
        let root = tempdir().unwrap();
        let frames = make_frames(src.path(), 3, "jpg");

        let staged = build_timeline_with(
            &frames,
            &LoopSpec::disabled(),
            root.path(),
            StageMode::HardLink,
        )
        .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.join("frame_0003.jpg").exists());

        drop(staged);
        assert!(!path.exists());
        // Source frames are untouched by removing hard links
        assert!(frames.frames()[0].path.exists());
    }

    #[test]
    fn long_timelines_widen_padding() {
        let src = tempdir().unwrap();
        let root = tempdir().unwrap();
        let frames = make_frames(src.path(), 2, "png");
        // 2*2 + 2*120 = 244 frames, still 4 digits
        let staged =
            build_timeline(&frames, &LoopSpec::looped(120).unwrap(), root.path()).unwrap();
        assert_eq!(staged.padding(), 4);
        assert_eq!(staged.len(), 244);
    }
}

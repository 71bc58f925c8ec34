//! Frame-by-frame EXR conversion into a persistent PNG cache.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use super::transform::{alpha_encode, display_encode};
use super::{ConvertError, ConvertResult};
use crate::cancel::CancelHandle;
use crate::models::{Frame, FrameSequence, ViewTransform};

/// Display conversion settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    pub view_transform: ViewTransform,
    /// Exposure adjustment in stops.
    pub exposure: f32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            view_transform: ViewTransform::Filmic,
            exposure: 0.0,
        }
    }
}

impl ConvertOptions {
    fn gain(&self) -> f32 {
        2f32.powf(self.exposure)
    }

    /// Cache subdirectory for these options, e.g. `filmic_ev+0.000`.
    ///
    /// Frames converted with different settings never share a directory.
    pub fn cache_key(&self) -> String {
        format!("{}_ev{:+.3}", self.view_transform, self.exposure)
    }
}

/// What a conversion pass did.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Frames ready for staging, in the input order.
    pub frames: FrameSequence,
    pub converted: usize,
    pub cached: usize,
    pub failed: Vec<(PathBuf, ConvertError)>,
    /// Set when cancellation stopped the pass early.
    pub cancelled: bool,
}

/// Convert an all-EXR sequence to PNGs under `work_dir/<cache key>`.
///
/// Sequences containing any non-EXR frame are returned unchanged.
pub fn convert_if_needed(
    frames: &FrameSequence,
    work_dir: &Path,
    options: &ConvertOptions,
) -> FrameSequence {
    if !frames.is_all_hdr() {
        return frames.clone();
    }
    convert_frames(frames, work_dir, options, None).frames
}

/// Convert every frame, reporting per-frame outcomes.
///
/// Converted frames that are at least as new as their source are reused.
/// Failed frames are dropped from the returned sequence and listed in
/// `failed`.
pub fn convert_frames(
    frames: &FrameSequence,
    work_dir: &Path,
    options: &ConvertOptions,
    cancel: Option<&CancelHandle>,
) -> ConversionReport {
    let mut report = ConversionReport::default();
    let work_dir = &work_dir.join(options.cache_key());

    if let Err(e) = fs::create_dir_all(work_dir) {
        tracing::error!("Cannot create HDR cache {}: {}", work_dir.display(), e);
        report.failed = frames
            .iter()
            .map(|f| {
                (
                    f.path.clone(),
                    ConvertError::io(
                        format!("creating {}", work_dir.display()),
                        std::io::Error::new(e.kind(), e.to_string()),
                    ),
                )
            })
            .collect();
        return report;
    }

    let mut output = Vec::with_capacity(frames.len());

    for frame in frames {
        if cancel.is_some_and(CancelHandle::is_cancelled) {
            tracing::warn!("HDR conversion cancelled after {} frame(s)", output.len());
            report.cancelled = true;
            break;
        }

        let dest = output_path(work_dir, frame);
        if is_fresh(&dest, &frame.path) {
            tracing::debug!("Reusing converted frame {}", dest.display());
            report.cached += 1;
            output.push(Frame::new(frame.index, dest));
            continue;
        }

        match convert_one(&frame.path, &dest, options) {
            Ok(()) => {
                tracing::debug!("Converted {} -> {}", frame.path.display(), dest.display());
                report.converted += 1;
                output.push(Frame::new(frame.index, dest));
            }
            Err(e) => {
                tracing::warn!("Skipping frame {}: {}", frame.path.display(), e);
                report.failed.push((frame.path.clone(), e));
            }
        }
    }

    tracing::info!(
        "HDR conversion: {} converted, {} cached, {} failed",
        report.converted,
        report.cached,
        report.failed.len()
    );

    report.frames = FrameSequence::new(output);
    report
}

/// `<work_dir>/<source stem>.png`
fn output_path(work_dir: &Path, frame: &Frame) -> PathBuf {
    let stem = frame
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("frame_{}", frame.index));
    work_dir.join(format!("{stem}.png"))
}

/// A cached PNG is usable when it exists and is not older than its source.
fn is_fresh(dest: &Path, source: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified());
    match (modified(dest), modified(source)) {
        (Ok(cached), Ok(src)) => cached >= src,
        (Ok(_), Err(_)) => true,
        (Err(_), _) => false,
    }
}

fn convert_one(source: &Path, dest: &Path, options: &ConvertOptions) -> ConvertResult<()> {
    let decoded = image::open(source).map_err(|e| ConvertError::Decode {
        path: source.display().to_string(),
        message: e.to_string(),
    })?;

    let linear = decoded.to_rgba32f();
    let (width, height) = linear.dimensions();
    let gain = options.gain();
    let view = options.view_transform;

    let mut display = RgbaImage::new(width, height);
    for (src, dst) in linear.pixels().zip(display.pixels_mut()) {
        let [r, g, b, a] = src.0;
        dst.0 = [
            display_encode(r, gain, view),
            display_encode(g, gain, view),
            display_encode(b, gain, view),
            alpha_encode(a),
        ];
    }

    // Never leave a partial PNG under the final name
    let tmp = dest.with_extension("png.partial");
    display
        .save_with_format(&tmp, ImageFormat::Png)
        .map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ConvertError::Encode {
                path: dest.display().to_string(),
                message: e.to_string(),
            }
        })?;
    fs::rename(&tmp, dest).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ConvertError::io(format!("renaming into {}", dest.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, Rgba32FImage};
    use tempfile::tempdir;

    fn write_exr(path: &Path, value: f32) {
        let img = Rgba32FImage::from_pixel(4, 2, Rgba([value, value, value, 1.0]));
        img.save_with_format(path, ImageFormat::OpenExr).unwrap();
    }

    fn cache_dir(work: &Path) -> PathBuf {
        work.join(ConvertOptions::default().cache_key())
    }

    fn exr_sequence(dir: &Path, n: u64) -> FrameSequence {
        let frames = (1..=n)
            .map(|i| {
                let path = dir.join(format!("shot_{:04}.exr", i));
                write_exr(&path, 0.25 * i as f32);
                Frame::new(i, path)
            })
            .collect();
        FrameSequence::new(frames)
    }

    #[test]
    fn non_hdr_sequences_pass_through() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let png = src.path().join("shot_0001.png");
        fs::write(&png, "not decoded").unwrap();
        let frames = FrameSequence::new(vec![Frame::new(1, png.clone())]);

        let out = convert_if_needed(&frames, work.path(), &ConvertOptions::default());
        assert_eq!(out.paths(), vec![png.as_path()]);
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn exr_frames_become_pngs() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let frames = exr_sequence(src.path(), 3);

        let out = convert_if_needed(&frames, work.path(), &ConvertOptions::default());
        assert_eq!(out.len(), 3);
        for (i, frame) in out.iter().enumerate() {
            assert_eq!(frame.index, i as u64 + 1);
            assert_eq!(
                frame.path,
                cache_dir(work.path()).join(format!("shot_{:04}.png", i + 1))
            );
            let img = image::open(&frame.path).unwrap().to_rgba8();
            assert_eq!(img.dimensions(), (4, 2));
            assert_eq!(img.get_pixel(0, 0).0[3], 255);
        }
        // No temp files left behind
        assert_eq!(fs::read_dir(cache_dir(work.path())).unwrap().count(), 3);
    }

    #[test]
    fn existing_outputs_are_reused() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let frames = exr_sequence(src.path(), 2);

        let cached = cache_dir(work.path()).join("shot_0001.png");
        fs::create_dir_all(cache_dir(work.path())).unwrap();
        fs::write(&cached, "sentinel").unwrap();

        let report = convert_frames(&frames, work.path(), &ConvertOptions::default(), None);
        assert_eq!(report.cached, 1);
        assert_eq!(report.converted, 1);
        assert_eq!(fs::read_to_string(&cached).unwrap(), "sentinel");
    }

    #[test]
    fn undecodable_frames_are_skipped() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let good = src.path().join("shot_0001.exr");
        let bad = src.path().join("shot_0002.exr");
        write_exr(&good, 0.5);
        fs::write(&bad, b"definitely not an exr").unwrap();
        let frames = FrameSequence::new(vec![Frame::new(1, good), Frame::new(2, bad.clone())]);

        let report = convert_frames(&frames, work.path(), &ConvertOptions::default(), None);
        assert_eq!(report.frames.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);
        assert!(!cache_dir(work.path()).join("shot_0002.png").exists());
    }

    #[test]
    fn cancellation_stops_between_frames() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let frames = exr_sequence(src.path(), 2);
        let cancel = CancelHandle::new();
        cancel.cancel();

        let report =
            convert_frames(&frames, work.path(), &ConvertOptions::default(), Some(&cancel));
        assert!(report.cancelled);
        assert!(report.frames.is_empty());
    }

    #[test]
    fn exposure_changes_output() {
        let src = tempdir().unwrap();
        let frames = exr_sequence(src.path(), 1);

        let dark = tempdir().unwrap();
        let bright = tempdir().unwrap();
        let opts = |exposure| ConvertOptions {
            view_transform: ViewTransform::Standard,
            exposure,
        };
        let a = convert_if_needed(&frames, dark.path(), &opts(-2.0));
        let b = convert_if_needed(&frames, bright.path(), &opts(1.0));

        let pa = image::open(&a.frames()[0].path).unwrap().to_rgba8();
        let pb = image::open(&b.frames()[0].path).unwrap().to_rgba8();
        assert!(pa.get_pixel(0, 0).0[0] < pb.get_pixel(0, 0).0[0]);
    }

    #[test]
    fn changed_settings_reconvert_in_shared_cache() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let frames = exr_sequence(src.path(), 1);
        let opts = |exposure| ConvertOptions {
            view_transform: ViewTransform::Standard,
            exposure,
        };

        let first = convert_frames(&frames, work.path(), &opts(-2.0), None);
        let second = convert_frames(&frames, work.path(), &opts(1.0), None);
        assert_eq!(second.converted, 1);
        assert_eq!(second.cached, 0);
        assert_ne!(first.frames.frames()[0].path, second.frames.frames()[0].path);

        let dark = image::open(&first.frames.frames()[0].path).unwrap().to_rgba8();
        let bright = image::open(&second.frames.frames()[0].path).unwrap().to_rgba8();
        assert!(dark.get_pixel(0, 0).0[0] < bright.get_pixel(0, 0).0[0]);

        let again = convert_frames(&frames, work.path(), &opts(-2.0), None);
        assert_eq!(again.cached, 1);
    }

    #[test]
    fn rerendered_source_invalidates_cache() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let frames = exr_sequence(src.path(), 1);

        let cached = cache_dir(work.path()).join("shot_0001.png");
        fs::create_dir_all(cache_dir(work.path())).unwrap();
        fs::write(&cached, "stale").unwrap();
        let old = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&cached)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let report = convert_frames(&frames, work.path(), &ConvertOptions::default(), None);
        assert_eq!(report.converted, 1);
        assert_eq!(report.cached, 0);
        assert!(image::open(&cached).is_ok());
    }
}

//! Media transform pipeline.
//!
//! Turns one local input video into one streaming-ready, face-anonymized
//! output: decode frames in order, blur detected faces, write an
//! intermediate raw container, then re-encode it with FFmpeg for fast-start
//! playback. Stage order is strict: Opened -> Streaming -> Finalized ->
//! Reencoded (or ReencodeFailed, with the intermediate retained).

use std::path::{Path, PathBuf};

use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio::{
    VideoCapture, VideoWriter, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH,
};
use tracing::{debug, error, info, warn};

use crate::anonymizer::{DetectorConfig, FrameAnonymizer};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::inspect_artifact;

/// Fallback geometry when the source container omits dimensions.
const FALLBACK_WIDTH: i32 = 640;
const FALLBACK_HEIGHT: i32 = 480;
/// Fallback frame rate when the source container omits it.
const FALLBACK_FPS: f64 = 30.0;

/// Consecutive per-frame detector failures treated as systemic corruption.
const MAX_CONSECUTIVE_DETECTOR_FAILURES: usize = 5;

/// Summary of a completed transform.
#[derive(Debug, Clone)]
pub struct TransformReport {
    /// Frames read and written
    pub frames: usize,
    /// Total face regions blurred
    pub faces_blurred: usize,
    /// Frames whose detector call failed and were passed through unblurred
    pub frames_passed_through: usize,
    /// Output geometry
    pub width: i32,
    pub height: i32,
    /// Output frame rate
    pub fps: f64,
}

/// Transform a local input video into a streaming-ready anonymized output.
///
/// On success the intermediate raw container is deleted and the final
/// artifact sits at `output`. On re-encode failure the intermediate is
/// retained for diagnostics and `MediaError::ReencodeFailed` is returned:
/// the job is failed even though frame processing succeeded, because the
/// caller expects a streaming-ready deliverable.
pub async fn transform_video(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    detector_config: DetectorConfig,
    reencode_timeout_secs: u64,
) -> MediaResult<TransformReport> {
    let input = input.as_ref();
    let output = output.as_ref();

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let intermediate = raw_intermediate_path(output);

    // Frame streaming is synchronous OpenCV work; no awaits happen while
    // capture/writer handles are alive.
    let report = stream_frames(input, &intermediate, detector_config)?;

    info!(
        "Anonymized {} frames ({} regions blurred, {} passed through), re-encoding",
        report.frames, report.faces_blurred, report.frames_passed_through
    );

    let cmd = FfmpegCommand::new(&intermediate, output)
        .video_codec("libx264")
        .preset("fast")
        .crf(23)
        .audio_codec("aac")
        .faststart();

    let runner = FfmpegRunner::new().with_timeout(reencode_timeout_secs);

    if let Err(e) = runner.run(&cmd).await {
        error!(
            "Re-encode failed for {}: {} (intermediate retained at {})",
            output.display(),
            e,
            intermediate.display()
        );
        return Err(MediaError::reencode_failed(e.to_string(), intermediate));
    }

    if let Err(e) = tokio::fs::remove_file(&intermediate).await {
        warn!(
            "Failed to clean up intermediate {}: {}",
            intermediate.display(),
            e
        );
    }

    if let Ok(info) = inspect_artifact(output).await {
        debug!(
            "Final artifact {}: {}x{} @ {:.2} fps, {:.1}s, codec {}",
            output.display(),
            info.width,
            info.height,
            info.fps,
            info.duration_secs,
            info.video_codec
        );
    }

    Ok(report)
}

/// Decode, anonymize and re-write every frame, strictly in input order.
fn stream_frames(
    input: &Path,
    intermediate: &Path,
    detector_config: DetectorConfig,
) -> MediaResult<TransformReport> {
    let input_str = input.to_string_lossy();

    let mut anonymizer = FrameAnonymizer::new(detector_config)?;

    let mut cap = VideoCapture::from_file(&input_str, CAP_ANY)
        .map_err(|_| MediaError::SourceUnreadable(input.to_path_buf()))?;
    if !cap.is_opened().unwrap_or(false) {
        return Err(MediaError::SourceUnreadable(input.to_path_buf()));
    }

    let width = match cap.get(CAP_PROP_FRAME_WIDTH) {
        Ok(w) if w >= 1.0 => w as i32,
        _ => FALLBACK_WIDTH,
    };
    let height = match cap.get(CAP_PROP_FRAME_HEIGHT) {
        Ok(h) if h >= 1.0 => h as i32,
        _ => FALLBACK_HEIGHT,
    };
    let fps = match cap.get(CAP_PROP_FPS) {
        Ok(f) if f.is_finite() && f > 0.0 => f,
        _ => FALLBACK_FPS,
    };

    debug!("Source opened: {}x{} @ {:.2} fps", width, height, fps);

    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')
        .map_err(|e| MediaError::encode_failed(format!("fourcc: {}", e)))?;
    let mut writer = VideoWriter::new(
        &intermediate.to_string_lossy(),
        fourcc,
        fps,
        Size::new(width, height),
        true,
    )
    .map_err(|e| MediaError::encode_failed(format!("writer open: {}", e)))?;
    if !writer.is_opened().unwrap_or(false) {
        return Err(MediaError::encode_failed(format!(
            "cannot open intermediate writer: {}",
            intermediate.display()
        )));
    }

    let mut frames = 0usize;
    let mut faces_blurred = 0usize;
    let mut frames_passed_through = 0usize;
    let mut consecutive_failures = 0usize;

    loop {
        let mut frame = Mat::default();
        let got_frame = cap
            .read(&mut frame)
            .map_err(|e| MediaError::InvalidVideo(format!("frame decode: {}", e)))?;
        if !got_frame || frame.empty() {
            break;
        }

        match anonymizer.anonymize(&mut frame) {
            Ok(count) => {
                consecutive_failures = 0;
                faces_blurred += count;
            }
            Err(e) => {
                // A single bad frame passes through unblurred; an unbroken
                // run of failures means the stream itself is bad.
                consecutive_failures += 1;
                frames_passed_through += 1;
                warn!(
                    "Detector failed on frame {} ({} consecutive): {}",
                    frames, consecutive_failures, e
                );
                if consecutive_failures >= MAX_CONSECUTIVE_DETECTOR_FAILURES {
                    return Err(MediaError::detection_failed(format!(
                        "detector failed on {} consecutive frames, aborting: {}",
                        consecutive_failures, e
                    )));
                }
            }
        }

        writer
            .write(&frame)
            .map_err(|e| MediaError::encode_failed(format!("frame write: {}", e)))?;
        frames += 1;
    }

    cap.release().ok();
    writer
        .release()
        .map_err(|e| MediaError::encode_failed(format!("writer finalize: {}", e)))?;

    Ok(TransformReport {
        frames,
        faces_blurred,
        frames_passed_through,
        width,
        height,
        fps,
    })
}

/// Path of the intermediate raw container, next to the final output.
///
/// `outputs/clip.mp4` gets its raw frames staged at `outputs/clip_raw.mp4`.
pub fn raw_intermediate_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_raw.mp4", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_path_is_a_sibling() {
        assert_eq!(
            raw_intermediate_path(Path::new("/work/outputs/clip.mp4")),
            PathBuf::from("/work/outputs/clip_raw.mp4")
        );
        assert_eq!(
            raw_intermediate_path(Path::new("a/b/video.mov")),
            PathBuf::from("a/b/video_raw.mp4")
        );
    }

    #[test]
    fn intermediate_path_is_injective_per_output() {
        assert_ne!(
            raw_intermediate_path(Path::new("outputs/a/clip.mp4")),
            raw_intermediate_path(Path::new("outputs/b/clip.mp4"))
        );
    }

    #[tokio::test]
    async fn unreadable_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");
        let output = dir.path().join("out.mp4");

        // Cascade may be absent in CI too; either error is job-fatal, but a
        // missing source must never produce an output artifact.
        let result = transform_video(&missing, &output, DetectorConfig::default(), 60).await;
        assert!(result.is_err());
        assert!(!output.exists());
    }
}

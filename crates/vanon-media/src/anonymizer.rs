//! Frame anonymizer: Haar cascade face detection plus per-region blurring.

use std::path::PathBuf;

use opencv::core::{Mat, Rect, Size, Vector, BORDER_DEFAULT};
use opencv::imgproc;
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use tracing::debug;

use vanon_models::FaceRect;

use crate::error::{MediaError, MediaResult};

/// Default Haar cascade shipped with OpenCV installs on Linux.
pub const DEFAULT_CASCADE_PATH: &str =
    "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml";

/// Face detector and blur configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the Haar cascade XML file
    pub cascade_path: PathBuf,
    /// Image pyramid scale factor between detection passes
    pub scale_factor: f64,
    /// Minimum neighboring detections required to keep a face
    pub min_neighbors: i32,
    /// Minimum face size in pixels (smaller candidates are ignored)
    pub min_face_size: i32,
    /// Gaussian blur kernel size (forced odd)
    pub blur_kernel: i32,
    /// Gaussian blur sigma
    pub blur_sigma: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from(DEFAULT_CASCADE_PATH),
            scale_factor: 1.3,
            min_neighbors: 5,
            min_face_size: 30,
            blur_kernel: 51,
            blur_sigma: 30.0,
        }
    }
}

impl DetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("FACE_CASCADE_PATH") {
            config.cascade_path = PathBuf::from(path);
        }
        if let Some(v) = env_parse("FACE_DETECT_SCALE_FACTOR") {
            config.scale_factor = v;
        }
        if let Some(v) = env_parse("FACE_DETECT_MIN_NEIGHBORS") {
            config.min_neighbors = v;
        }
        if let Some(v) = env_parse("FACE_BLUR_KERNEL") {
            config.blur_kernel = v;
        }
        if let Some(v) = env_parse("FACE_BLUR_SIGMA") {
            config.blur_sigma = v;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Detects faces in a frame and blurs each detected region in place.
///
/// Detection is independent per frame: no temporal tracking, overlapping
/// rectangles are blurred independently, and a frame with no detections is
/// left bit-identical.
pub struct FrameAnonymizer {
    cascade: CascadeClassifier,
    config: DetectorConfig,
}

impl FrameAnonymizer {
    /// Load the cascade and build an anonymizer.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        let cascade_path = config.cascade_path.to_string_lossy().to_string();

        if !config.cascade_path.exists() {
            return Err(MediaError::model_not_found(cascade_path));
        }

        let cascade = CascadeClassifier::new(&cascade_path)
            .map_err(|e| MediaError::model_not_found(format!("{}: {}", cascade_path, e)))?;

        if cascade.empty().unwrap_or(true) {
            return Err(MediaError::model_not_found(format!(
                "{}: cascade loaded empty",
                cascade_path
            )));
        }

        debug!("Loaded face cascade from {}", cascade_path);
        Ok(Self { cascade, config })
    }

    /// Build with environment-driven configuration.
    pub fn from_env() -> MediaResult<Self> {
        Self::new(DetectorConfig::from_env())
    }

    /// Detect face regions in a frame.
    ///
    /// Rectangles are clamped to the frame bounds. A detector failure on a
    /// malformed frame surfaces as `MediaError::DetectionFailed` so the
    /// pipeline can decide between pass-through and escalation.
    pub fn detect_faces(&mut self, frame: &Mat) -> MediaResult<Vec<FaceRect>> {
        let mut gray = Mat::default();
        imgproc::cvt_color(
            frame,
            &mut gray,
            imgproc::COLOR_BGR2GRAY,
            0,
        )
        .map_err(|e| MediaError::detection_failed(format!("bgr2gray: {}", e)))?;

        let mut faces: Vector<Rect> = Vector::new();
        self.cascade
            .detect_multi_scale(
                &gray,
                &mut faces,
                self.config.scale_factor,
                self.config.min_neighbors,
                0,
                Size::new(self.config.min_face_size, self.config.min_face_size),
                Size::new(0, 0),
            )
            .map_err(|e| MediaError::detection_failed(format!("cascade detect: {}", e)))?;

        let frame_width = frame.cols();
        let frame_height = frame.rows();

        Ok(faces
            .iter()
            .filter_map(|r| {
                FaceRect::new(r.x, r.y, r.width, r.height).clamped(frame_width, frame_height)
            })
            .collect())
    }

    /// Detect faces and blur each region in place.
    ///
    /// Returns the number of regions blurred; zero means the frame is
    /// untouched.
    pub fn anonymize(&mut self, frame: &mut Mat) -> MediaResult<usize> {
        let faces = self.detect_faces(frame)?;
        if faces.is_empty() {
            return Ok(0);
        }

        blur_regions(
            frame,
            &faces,
            self.config.blur_kernel,
            self.config.blur_sigma,
        )?;
        Ok(faces.len())
    }
}

/// Blur the given regions of a frame in place, leaving the rest untouched.
///
/// Separate from detection so the blur contract is testable without a
/// cascade file.
pub fn blur_regions(
    frame: &mut Mat,
    regions: &[FaceRect],
    kernel: i32,
    sigma: f64,
) -> MediaResult<()> {
    // Gaussian kernels must be odd
    let kernel = if kernel % 2 == 0 { kernel + 1 } else { kernel };
    let frame_width = frame.cols();
    let frame_height = frame.rows();

    for region in regions {
        let Some(region) = region.clamped(frame_width, frame_height) else {
            continue;
        };
        let rect = Rect::new(region.x, region.y, region.width, region.height);

        let roi = Mat::roi(frame, rect)
            .map_err(|e| MediaError::detection_failed(format!("roi: {}", e)))?
            .try_clone()
            .map_err(|e| MediaError::detection_failed(format!("roi clone: {}", e)))?;

        let mut blurred = Mat::default();
        imgproc::gaussian_blur(
            &roi,
            &mut blurred,
            Size::new(kernel, kernel),
            sigma,
            sigma,
            BORDER_DEFAULT,
        )
        .map_err(|e| MediaError::detection_failed(format!("gaussian blur: {}", e)))?;

        let mut target = Mat::roi_mut(frame, rect)
            .map_err(|e| MediaError::detection_failed(format!("roi mut: {}", e)))?;
        blurred
            .copy_to(&mut target)
            .map_err(|e| MediaError::detection_failed(format!("roi write: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};

    /// Build a frame with a deterministic gradient so blurring is visible.
    fn gradient_frame(width: i32, height: i32) -> Mat {
        let mut frame =
            Mat::new_rows_cols_with_default(height, width, CV_8UC3, opencv::core::Scalar::all(0.0))
                .unwrap();
        for y in 0..height {
            for x in 0..width {
                let px = frame.at_2d_mut::<Vec3b>(y, x).unwrap();
                *px = Vec3b::from([(x * 4 % 256) as u8, (y * 4 % 256) as u8, ((x + y) % 256) as u8]);
            }
        }
        frame
    }

    fn frames_equal_outside(a: &Mat, b: &Mat, exclude: &FaceRect) -> bool {
        for y in 0..a.rows() {
            for x in 0..a.cols() {
                let inside = x >= exclude.x
                    && x < exclude.x + exclude.width
                    && y >= exclude.y
                    && y < exclude.y + exclude.height;
                if inside {
                    continue;
                }
                let pa = a.at_2d::<Vec3b>(y, x).unwrap();
                let pb = b.at_2d::<Vec3b>(y, x).unwrap();
                if pa != pb {
                    return false;
                }
            }
        }
        true
    }

    fn region_changed(a: &Mat, b: &Mat, region: &FaceRect) -> bool {
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let pa = a.at_2d::<Vec3b>(y, x).unwrap();
                let pb = b.at_2d::<Vec3b>(y, x).unwrap();
                if pa != pb {
                    return true;
                }
            }
        }
        false
    }

    #[test]
    fn zero_regions_leaves_frame_identical() {
        let original = gradient_frame(64, 64);
        let mut frame = original.try_clone().unwrap();

        blur_regions(&mut frame, &[], 51, 30.0).unwrap();

        let none = FaceRect::new(0, 0, 0, 0);
        assert!(frames_equal_outside(&original, &frame, &none));
    }

    #[test]
    fn blur_changes_only_the_region() {
        let original = gradient_frame(64, 64);
        let mut frame = original.try_clone().unwrap();
        let region = FaceRect::new(8, 8, 24, 24);

        blur_regions(&mut frame, &[region], 11, 5.0).unwrap();

        assert!(region_changed(&original, &frame, &region));
        assert!(frames_equal_outside(&original, &frame, &region));
    }

    #[test]
    fn out_of_bounds_region_is_clamped_not_fatal() {
        let original = gradient_frame(32, 32);
        let mut frame = original.try_clone().unwrap();
        // Extends past the right/bottom edge
        let region = FaceRect::new(20, 20, 40, 40);

        blur_regions(&mut frame, &[region], 11, 5.0).unwrap();

        let clamped = region.clamped(32, 32).unwrap();
        assert!(region_changed(&original, &frame, &clamped));
        assert!(frames_equal_outside(&original, &frame, &clamped));
    }

    #[test]
    fn even_kernel_is_accepted() {
        let mut frame = gradient_frame(32, 32);
        let region = FaceRect::new(4, 4, 16, 16);
        // 50 is bumped to 51 internally
        blur_regions(&mut frame, &[region], 50, 30.0).unwrap();
    }
}

#![deny(unreachable_patterns)]
//! Face anonymization pipeline for video files.
//!
//! This crate provides:
//! - Haar cascade face detection with per-region Gaussian blurring
//! - The media transform pipeline (decode, anonymize, encode, re-encode)
//! - Type-safe FFmpeg command building with a supervised, time-bounded runner
//! - FFprobe inspection of finished artifacts

pub mod command;
pub mod error;
pub mod probe;

#[cfg(feature = "opencv")]
pub mod anonymizer;
#[cfg(feature = "opencv")]
pub mod pipeline;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{inspect_artifact, ArtifactInfo};

#[cfg(feature = "opencv")]
pub use anonymizer::{DetectorConfig, FrameAnonymizer};
#[cfg(feature = "opencv")]
pub use pipeline::{transform_video, TransformReport};

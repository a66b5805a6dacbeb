//! FFprobe inspection of finished artifacts.
//!
//! Used after the re-encode step to confirm the deliverable has a playable
//! video stream and to log its geometry. Only the first video stream is
//! consulted; the re-encode guarantees there is at most one.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Geometry and codec of a probed artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_secs: f64,
    pub video_codec: String,
}

#[derive(Deserialize)]
struct ProbeDoc {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Inspect an artifact with ffprobe.
///
/// An artifact without a video stream is not playable and is reported as
/// `InvalidVideo`; a missing or unreadable file surfaces as `FfprobeFailed`
/// with ffprobe's own stderr attached.
pub async fn inspect_artifact(path: impl AsRef<Path>) -> MediaResult<ArtifactInfo> {
    let path = path.as_ref();
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_name,width,height,avg_frame_rate,r_frame_rate",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    let doc: ProbeDoc = serde_json::from_slice(&output.stdout)?;
    let stream = doc.streams.into_iter().next().ok_or_else(|| {
        MediaError::InvalidVideo(format!("no video stream in {}", path.display()))
    })?;

    // avg_frame_rate can be "0/0" for some containers; fall back to the
    // declared rate in that case.
    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rational))
        .unwrap_or(0.0);

    let duration_secs = doc
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse().ok())
        .unwrap_or(0.0);

    Ok(ArtifactInfo {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        duration_secs,
        video_codec: stream.codec_name.unwrap_or_default(),
    })
}

/// ffprobe reports rates both as rationals ("30000/1001") and plain
/// decimals ("29.97").
fn parse_rational(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_and_decimal_rates() {
        assert_eq!(parse_rational("30/1"), Some(30.0));
        assert!((parse_rational("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_rational("25"), Some(25.0));
        assert!((parse_rational("29.97").unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn degenerate_rates_are_none() {
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("30/0"), None);
        assert_eq!(parse_rational("nonsense"), None);
    }

    #[test]
    fn probe_document_shape() {
        let doc: ProbeDoc = serde_json::from_str(
            r#"{
                "streams": [{
                    "codec_name": "h264",
                    "width": 1280,
                    "height": 720,
                    "avg_frame_rate": "0/0",
                    "r_frame_rate": "30/1"
                }],
                "format": { "duration": "12.500000" }
            }"#,
        )
        .unwrap();

        let stream = &doc.streams[0];
        assert_eq!(stream.width, Some(1280));
        assert_eq!(stream.avg_frame_rate.as_deref().and_then(parse_rational), None);
        assert_eq!(stream.r_frame_rate.as_deref().and_then(parse_rational), Some(30.0));
        assert_eq!(doc.format.unwrap().duration.as_deref(), Some("12.500000"));
    }
}

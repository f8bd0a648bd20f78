//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;

use crate::command::{resolve_tool, run_tool};
use crate::error::{MediaError, MediaResult, Stage};

/// Media file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds
    pub duration: f64,
    pub has_video: bool,
    pub has_audio: bool,
    /// Width of the first video stream, 0 without video
    pub width: u32,
    /// Height of the first video stream, 0 without video
    pub height: u32,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Probe a media file with the given ffprobe binary.
pub async fn probe_media(
    ffprobe: impl AsRef<Path>,
    path: impl AsRef<Path>,
    timeout_secs: Option<u64>,
) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(MediaError::probe(format!(
            "file does not exist: {}",
            path.display()
        )));
    }

    let binary = resolve_tool(ffprobe.as_ref()).map_err(|e| e.in_stage(Stage::Probe))?;

    let mut cmd = Command::new(binary);
    cmd.args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(path);

    let output = run_tool("ffprobe", cmd, None, timeout_secs)
        .await
        .map_err(|e| e.in_stage(Stage::Probe))?;

    parse_probe_output(&output.stdout)
}

/// Get media duration in seconds.
pub async fn get_duration(
    ffprobe: impl AsRef<Path>,
    path: impl AsRef<Path>,
    timeout_secs: Option<u64>,
) -> MediaResult<f64> {
    Ok(probe_media(ffprobe, path, timeout_secs).await?.duration)
}

/// Parse ffprobe JSON into [`MediaInfo`].
///
/// The container duration is preferred; a stream duration is used when the
/// container does not report one.
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::probe(format!("unparseable ffprobe output: {}", e)))?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds)
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref().and_then(parse_seconds))
                .reduce(f64::max)
        })
        .ok_or_else(|| MediaError::probe("no duration reported"))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        duration,
        has_video: video.is_some(),
        has_audio,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
    })
}

fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "width": 1080, "height": 1920, "duration": "120.000000"},
                {"codec_type": "audio", "duration": "119.98"}
            ],
            "format": {"duration": "120.033000", "size": "1000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 120.033).abs() < 1e-9);
        assert!(info.has_video);
        assert!(info.has_audio);
        assert_eq!((info.width, info.height), (1080, 1920));
    }

    #[test]
    fn test_falls_back_to_stream_duration() {
        let json = br#"{"streams": [{"codec_type": "audio", "duration": "45.5"}], "format": {}}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration, 45.5);
        assert!(!info.has_video);
    }

    #[test]
    fn test_rejects_missing_or_invalid_duration() {
        let missing = br#"{"streams": [], "format": {"duration": "N/A"}}"#;
        assert!(matches!(
            parse_probe_output(missing),
            Err(MediaError::Probe { .. })
        ));

        let negative = br#"{"format": {"duration": "-3.0"}}"#;
        assert!(parse_probe_output(negative).is_err());

        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(MediaError::Probe { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_probe_error() {
        let err = probe_media("ffprobe", "/nonexistent/input.mp4", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Probe { .. }));
    }
}

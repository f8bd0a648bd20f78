//! Tests against the real ffmpeg/ffprobe binaries.
//!
//! Run with `cargo test -p reel-media -- --ignored` on a machine with ffmpeg.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use reel_media::{
    trim, AssemblyConfig, AssemblyRequest, FfmpegTool, MediaError, MediaHandle, MediaResult,
    MediaTool, StartPolicy, Transcriber, VideoAssembler,
};
use reel_models::WordTimestamp;

async fn lavfi(source: &str, output: &Path, extra: &[&str]) {
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", source])
        .args(extra)
        .arg(output)
        .status()
        .await
        .unwrap();
    assert!(status.success(), "failed to generate {}", output.display());
}

async fn make_background(path: &Path, secs: u32) {
    lavfi(
        &format!("testsrc=duration={}:size=320x568:rate=25", secs),
        path,
        // Keyframe every second keeps stream-copy cuts close to the target
        &["-c:v", "libx264", "-g", "25", "-pix_fmt", "yuv420p"],
    )
    .await;
}

async fn make_narration(path: &Path, secs: u32) {
    lavfi(&format!("sine=frequency=440:duration={}", secs), path, &["-c:a", "aac"]).await;
}

struct FixedWords;

#[async_trait]
impl Transcriber for FixedWords {
    async fn transcribe(&self, _audio: &Path, _scratch: &Path) -> MediaResult<Vec<WordTimestamp>> {
        Ok((0..9)
            .map(|i| WordTimestamp::new(format!("w{}", i), i as f64 * 0.5, (i + 1) as f64 * 0.5))
            .collect())
    }
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_trim_matches_target_duration() {
    let dir = tempfile::tempdir().unwrap();
    let background = dir.path().join("bg.mp4");
    make_background(&background, 30).await;

    let tool = FfmpegTool::default();
    let handle = MediaHandle::new(&background);
    assert!((handle.duration(&tool).await.unwrap() - 30.0).abs() < 0.1);

    let output = dir.path().join("clip.mp4");
    let trimmed = trim(&tool, &handle, 12.0, StartPolicy::At(5.0), &output)
        .await
        .unwrap();
    let secs = trimmed.clip.duration(&tool).await.unwrap();
    assert!((secs - 12.0).abs() <= 0.1, "trimmed to {}", secs);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_trim_rejects_short_background() {
    let dir = tempfile::tempdir().unwrap();
    let background = dir.path().join("bg.mp4");
    make_background(&background, 5).await;

    let tool = FfmpegTool::default();
    let err = trim(
        &tool,
        &MediaHandle::new(&background),
        10.0,
        StartPolicy::Beginning,
        &dir.path().join("clip.mp4"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MediaError::InsufficientLength { .. }));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_assembly_with_real_ffmpeg() {
    let dir = tempfile::tempdir().unwrap();
    let background = dir.path().join("bg.mp4");
    let narration = dir.path().join("voice.m4a");
    make_background(&background, 20).await;
    make_narration(&narration, 6).await;

    let config = AssemblyConfig {
        work_root: dir.path().join("work"),
        tool_timeout_secs: Some(120),
        ..Default::default()
    };
    let tool = FfmpegTool::new(config.encoding.clone()).with_timeout(config.tool_timeout_secs);
    let assembler = VideoAssembler::new(tool, FixedWords, config);

    let output = dir.path().join("final.mp4");
    let outcome = assembler
        .assemble(&AssemblyRequest {
            background,
            narration,
            title: Some("Have you ever met someone famous?".to_string()),
            output: output.clone(),
            start: StartPolicy::At(2.0),
        })
        .await
        .unwrap();

    assert!((outcome.duration - 6.0).abs() < 0.5);
    let info = assembler.tool().probe(&output).await.unwrap();
    assert!(info.has_video);
    assert!(info.has_audio);
    assert_eq!(std::fs::read_dir(dir.path().join("work")).unwrap().count(), 0);
}

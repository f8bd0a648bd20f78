//! Assembly pipeline tests against fake tools.
//!
//! The fake tool stores a media description inside each file it writes, so
//! probing works on any file it produced even after the file has been moved.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use reel_media::{
    parse_srt, AssemblyConfig, AssemblyRequest, MediaError, MediaInfo, MediaResult, MediaTool,
    RenderJob, StartPolicy, Transcriber, VideoAssembler,
};
use reel_models::WordTimestamp;

fn write_fake(path: &Path, duration: f64, has_video: bool, has_audio: bool) {
    std::fs::write(
        path,
        format!("duration={} video={} audio={}", duration, has_video, has_audio),
    )
    .unwrap();
}

fn read_fake(path: &Path) -> MediaResult<MediaInfo> {
    let content = std::fs::read_to_string(path)?;
    let mut info = MediaInfo {
        duration: 0.0,
        has_video: false,
        has_audio: false,
        width: 1080,
        height: 1920,
    };
    for field in content.split_whitespace() {
        match field.split_once('=') {
            Some(("duration", v)) => info.duration = v.parse().map_err(|_| MediaError::probe("bad duration"))?,
            Some(("video", v)) => info.has_video = v == "true",
            Some(("audio", v)) => info.has_audio = v == "true",
            _ => return Err(MediaError::probe("not a media file")),
        }
    }
    Ok(info)
}

#[derive(Default)]
struct FakeTool {
    fail_render: bool,
    extracts: Mutex<Vec<(f64, f64)>>,
    renders: Mutex<Vec<RenderJob>>,
}

#[async_trait]
impl MediaTool for FakeTool {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        read_fake(path)
    }

    async fn extract(&self, input: &Path, output: &Path, start: f64, duration: f64) -> MediaResult<()> {
        let source = read_fake(input)?;
        self.extracts.lock().unwrap().push((start, duration));
        write_fake(output, duration, source.has_video, source.has_audio);
        Ok(())
    }

    async fn render(&self, job: &RenderJob) -> MediaResult<()> {
        self.renders.lock().unwrap().push(job.clone());
        if self.fail_render {
            return Err(MediaError::tool_failed(
                "ffmpeg",
                "FFmpeg exited with non-zero status",
                Some("[Parsed_drawtext_1 @ 0x5581] Cannot find a valid font".to_string()),
                Some(1),
            ));
        }
        write_fake(&job.output, job.duration, true, false);
        Ok(())
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()> {
        let video = read_fake(video)?;
        read_fake(audio)?;
        write_fake(output, video.duration, true, true);
        Ok(())
    }
}

/// Nine words of half a second each.
struct FakeTranscriber;

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &Path, scratch_dir: &Path) -> MediaResult<Vec<WordTimestamp>> {
        assert!(audio.is_file());
        assert!(scratch_dir.is_dir());
        // Scratch output must be cleaned up with the run
        std::fs::write(scratch_dir.join("words.json"), b"{}")?;
        Ok((0..9)
            .map(|i| WordTimestamp::new(format!(" word{}", i), i as f64 * 0.5, (i + 1) as f64 * 0.5))
            .collect())
    }
}

struct Fixture {
    _dir: TempDir,
    work_root: PathBuf,
    background: PathBuf,
    narration: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(background_secs: f64, narration_secs: f64) -> Self {
        let dir = TempDir::new().unwrap();
        let work_root = dir.path().join("work");
        let background = dir.path().join("background.mp4");
        let narration = dir.path().join("narration.mp3");
        let output = dir.path().join("out").join("final.mp4");
        write_fake(&background, background_secs, true, true);
        write_fake(&narration, narration_secs, false, true);
        Self {
            _dir: dir,
            work_root,
            background,
            narration,
            output,
        }
    }

    fn config(&self) -> AssemblyConfig {
        AssemblyConfig {
            work_root: self.work_root.clone(),
            ..Default::default()
        }
    }

    fn request(&self, start: StartPolicy) -> AssemblyRequest {
        AssemblyRequest {
            background: self.background.clone(),
            narration: self.narration.clone(),
            title: Some("What is the worst thing you have ever done".to_string()),
            output: self.output.clone(),
            start,
        }
    }

    fn work_root_entries(&self) -> usize {
        std::fs::read_dir(&self.work_root)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[tokio::test]
async fn test_end_to_end_assembly() {
    let fx = Fixture::new(120.0, 45.0);
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, fx.config());

    let outcome = assembler.assemble(&fx.request(StartPolicy::At(10.0))).await.unwrap();

    assert_eq!(outcome.output, fx.output);
    assert_eq!(outcome.background_start, 10.0);
    assert!((outcome.duration - 45.0).abs() < 0.1);
    assert_eq!(outcome.cues.len(), 3);
    assert_eq!(outcome.cues[0].text, "word0 word1 word2");
    assert_eq!(outcome.cues[2].end, 4.5);
    assert!(outcome.subtitles.is_none());

    let extracts = assembler.tool().extracts.lock().unwrap().clone();
    assert_eq!(extracts, vec![(10.0, 45.0)]);

    let renders = assembler.tool().renders.lock().unwrap().clone();
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].filter_complex.matches("drawtext=").count(), 4);
    assert!(renders[0]
        .filter_complex
        .contains("enable='between(t,1.500,3.000)'"));

    let info = read_fake(&fx.output).unwrap();
    assert!(info.has_audio);
    assert!(info.has_video);

    // Only the final output remains
    assert_eq!(fx.work_root_entries(), 0);
    let out_dir: Vec<_> = std::fs::read_dir(fx.output.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(out_dir, vec![std::ffi::OsString::from("final.mp4")]);
}

#[tokio::test]
async fn test_random_start_within_bounds() {
    let fx = Fixture::new(120.0, 45.0);
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, fx.config());

    let outcome = assembler.assemble(&fx.request(StartPolicy::Random)).await.unwrap();
    assert!((0.0..=75.0).contains(&outcome.background_start));
}

#[tokio::test]
async fn test_background_too_short() {
    let fx = Fixture::new(30.0, 45.0);
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, fx.config());

    let err = assembler
        .assemble(&fx.request(StartPolicy::Beginning))
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::InsufficientLength { .. }));
    assert!(err.is_input_error());
    assert!(!fx.output.exists());
    assert_eq!(fx.work_root_entries(), 0);
}

#[tokio::test]
async fn test_fixed_start_past_end() {
    let fx = Fixture::new(120.0, 45.0);
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, fx.config());

    let err = assembler
        .assemble(&fx.request(StartPolicy::At(100.0)))
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::InsufficientLength { .. }));
    assert!(assembler.tool().extracts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_render_failure_cleans_up_and_keeps_output() {
    let fx = Fixture::new(120.0, 45.0);
    std::fs::create_dir_all(fx.output.parent().unwrap()).unwrap();
    std::fs::write(&fx.output, b"previous video").unwrap();

    let tool = FakeTool {
        fail_render: true,
        ..Default::default()
    };
    let assembler = VideoAssembler::new(tool, FakeTranscriber, fx.config());

    let err = assembler
        .assemble(&fx.request(StartPolicy::Beginning))
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::Render { .. }));
    assert!(err.tool_output().unwrap().contains("Cannot find a valid font"));
    assert_eq!(std::fs::read(&fx.output).unwrap(), b"previous video");
    assert_eq!(fx.work_root_entries(), 0);
}

#[tokio::test]
async fn test_keep_failed_artifacts() {
    let fx = Fixture::new(120.0, 45.0);
    let tool = FakeTool {
        fail_render: true,
        ..Default::default()
    };
    let config = AssemblyConfig {
        keep_failed_artifacts: true,
        ..fx.config()
    };
    let assembler = VideoAssembler::new(tool, FakeTranscriber, config);

    assert!(assembler
        .assemble(&fx.request(StartPolicy::Beginning))
        .await
        .is_err());

    let runs: Vec<PathBuf> = std::fs::read_dir(&fx.work_root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].join("trimmed.mp4").is_file());
}

#[tokio::test]
async fn test_subtitle_export() {
    let fx = Fixture::new(120.0, 45.0);
    let config = AssemblyConfig {
        export_subtitles: true,
        ..fx.config()
    };
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, config);

    let outcome = tokio_test::assert_ok!(assembler.assemble(&fx.request(StartPolicy::Beginning)).await);
    let srt_path = outcome.subtitles.unwrap();
    assert_eq!(srt_path, fx.output.with_extension("srt"));

    let cues = parse_srt(&std::fs::read_to_string(&srt_path).unwrap()).unwrap();
    assert_eq!(cues, outcome.cues);
    assert_eq!(fx.work_root_entries(), 0);
}

#[tokio::test]
async fn test_unplaceable_subtitles_do_not_fail_committed_run() {
    let fx = Fixture::new(120.0, 45.0);
    // A directory where the sidecar should go
    std::fs::create_dir_all(fx.output.with_extension("srt").join("taken")).unwrap();
    std::fs::write(&fx.output, b"previous video").unwrap();

    let config = AssemblyConfig {
        export_subtitles: true,
        ..fx.config()
    };
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, config);

    let outcome = tokio_test::assert_ok!(assembler.assemble(&fx.request(StartPolicy::Beginning)).await);
    assert!(outcome.subtitles.is_none());
    assert!(read_fake(&fx.output).unwrap().has_audio);
    assert!(fx.output.with_extension("srt").is_dir());
    assert_eq!(fx.work_root_entries(), 0);
}

#[tokio::test]
async fn test_missing_title_template() {
    let fx = Fixture::new(120.0, 45.0);
    let config = AssemblyConfig {
        title_template: Some(PathBuf::from("/nonexistent/redditQuestionTemplate.png")),
        ..fx.config()
    };
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, config);

    let err = assembler
        .assemble(&fx.request(StartPolicy::Beginning))
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::ArtifactMissing(_)));
    assert!(assembler.tool().renders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_narration_is_probe_error() {
    let fx = Fixture::new(120.0, 45.0);
    std::fs::remove_file(&fx.narration).unwrap();
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, fx.config());

    let err = tokio_test::assert_err!(assembler.assemble(&fx.request(StartPolicy::Beginning)).await);
    assert!(matches!(err, MediaError::Probe { .. }));
}

#[tokio::test]
async fn test_concurrent_runs_do_not_collide() {
    let fx = Fixture::new(120.0, 10.0);
    let assembler = VideoAssembler::new(FakeTool::default(), FakeTranscriber, fx.config());

    let first = fx.request(StartPolicy::Random);
    let mut second = fx.request(StartPolicy::Random);
    second.output = fx.output.with_file_name("second.mp4");

    let (a, b) = tokio::join!(assembler.assemble(&first), assembler.assemble(&second));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.run_id, b.run_id);
    assert!(a.output.is_file());
    assert!(b.output.is_file());
    assert_eq!(fx.work_root_entries(), 0);
}

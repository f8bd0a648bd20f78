//! The media tool seam and its ffmpeg implementation.
//!
//! Pipeline stages talk to [`MediaTool`] only, so tests can substitute a fake
//! that writes placeholder files instead of transcoding.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use reel_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_media, MediaInfo};

/// A fully-specified render pass: inputs, a filter graph and the label to map.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    /// Inputs in `-i` order; `[n:v]` in the graph refers to `inputs[n]`
    pub inputs: Vec<PathBuf>,
    /// The `-filter_complex` graph
    pub filter_complex: String,
    /// Output label of the graph, e.g. `[l4]`
    pub output_label: String,
    pub output: PathBuf,
    /// Expected output length in seconds, used for progress reporting
    pub duration: f64,
}

/// External media operations used by the assembly stages.
///
/// Implementations return plumbing errors; stages attribute them.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Probe duration and stream layout.
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    /// Playback duration in seconds.
    async fn duration(&self, path: &Path) -> MediaResult<f64> {
        Ok(self.probe(path).await?.duration)
    }

    /// Copy `duration` seconds starting at `start` without re-encoding.
    async fn extract(&self, input: &Path, output: &Path, start: f64, duration: f64) -> MediaResult<()>;

    /// Render a filter graph to a video-only file.
    async fn render(&self, job: &RenderJob) -> MediaResult<()>;

    /// Combine a video stream (copied) with an audio stream (encoded).
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()>;
}

/// [`MediaTool`] backed by the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout_secs: Option<u64>,
    encoding: EncodingConfig,
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new(EncodingConfig::default())
    }
}

impl FfmpegTool {
    /// Create a tool using `ffmpeg`/`ffprobe` from PATH.
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout_secs: None,
            encoding,
        }
    }

    /// Use specific binaries.
    pub fn with_binaries(mut self, ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    /// Kill any invocation running longer than `secs`.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new()
            .with_binary(&self.ffmpeg)
            .with_optional_timeout(self.timeout_secs)
    }

    /// The stream-copy extraction command.
    pub fn extract_command(input: &Path, output: &Path, start: f64, duration: f64) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .seek(start)
            .duration(duration)
            .codec_copy()
            .output_args(["-avoid_negative_ts", "make_zero"])
    }

    /// The video-only render command for a job.
    pub fn render_command(&self, job: &RenderJob) -> Option<FfmpegCommand> {
        let (first, rest) = job.inputs.split_first()?;
        let mut cmd = FfmpegCommand::new(first, &job.output);
        for input in rest {
            cmd = cmd.add_input(input);
        }
        Some(
            cmd.filter_complex(&job.filter_complex)
                .map(&job.output_label)
                .output_args(self.encoding.video_args())
                .no_audio(),
        )
    }

    /// The mux command: video copied, audio encoded.
    pub fn mux_command(&self, video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(video, output)
            .add_input(audio)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("copy")
            .output_args(self.encoding.audio_args())
            .output_args(["-movflags", "+faststart"])
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(&self.ffprobe, path, self.timeout_secs).await
    }

    async fn extract(&self, input: &Path, output: &Path, start: f64, duration: f64) -> MediaResult<()> {
        let cmd = Self::extract_command(input, output, start, duration);
        self.runner().run(&cmd).await
    }

    async fn render(&self, job: &RenderJob) -> MediaResult<()> {
        let cmd = self.render_command(job).ok_or_else(|| {
            MediaError::InvalidInput("render job has no inputs".to_string())
        })?;

        let total = job.duration;
        self.runner()
            .run_with_progress(&cmd, move |p| {
                debug!(
                    percent = p.percentage(total),
                    speed = p.speed,
                    "render progress"
                );
            })
            .await
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()> {
        let cmd = self.mux_command(video, audio, output);
        self.runner().run(&cmd).await
    }
}

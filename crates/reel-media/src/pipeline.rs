//! The narration video assembler.
//!
//! probe → trim → transcribe → segment → composite → mux → cleanup, strictly
//! in that order. Every intermediate file lives in the run directory of an
//! [`ArtifactTracker`], which removes it whether the run succeeds or not.

use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

use reel_models::{CaptionCue, EncodingConfig, RunId};

use crate::artifacts::ArtifactTracker;
use crate::captions::{segment, write_srt, DEFAULT_WORDS_PER_CUE};
use crate::compositor::{composite, CompositeStyle, TitleCard};
use crate::error::{MediaError, MediaResult, Stage};
use crate::fs_utils::move_file;
use crate::media::MediaHandle;
use crate::metrics;
use crate::mux::mux;
use crate::text::FontSource;
use crate::transcribe::Transcriber;
use crate::trim::{trim, StartPolicy};
use crate::tool::MediaTool;

/// Default timeout for a single external tool invocation.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 1800;

/// Assembly settings.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Parent of the per-run working directories
    pub work_root: PathBuf,
    pub words_per_cue: NonZeroUsize,
    /// Write `<output stem>.srt` next to the output
    pub export_subtitles: bool,
    /// Leave a failed run's directory in place
    pub keep_failed_artifacts: bool,
    /// Title card image; without one the title is drawn on the video
    pub title_template: Option<PathBuf>,
    pub style: CompositeStyle,
    pub encoding: EncodingConfig,
    /// Per-invocation timeout, `None` to wait indefinitely
    pub tool_timeout_secs: Option<u64>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("storyreel"),
            words_per_cue: DEFAULT_WORDS_PER_CUE,
            export_subtitles: false,
            keep_failed_artifacts: false,
            title_template: None,
            style: CompositeStyle::default(),
            encoding: EncodingConfig::default(),
            tool_timeout_secs: Some(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl AssemblyConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut style = defaults.style;
        if let Ok(font) = std::env::var("REEL_TITLE_FONT") {
            style.title.font = FontSource::File(PathBuf::from(font));
        }
        if let Ok(font) = std::env::var("REEL_CAPTION_FONT") {
            style.caption.font = FontSource::File(PathBuf::from(font));
        }

        let mut encoding = defaults.encoding;
        if let Some(crf) = std::env::var("REEL_CRF").ok().and_then(|s| s.parse().ok()) {
            encoding = encoding.with_crf(crf);
        }
        if let Ok(preset) = std::env::var("REEL_PRESET") {
            encoding = encoding.with_preset(preset);
        }
        if env_flag("REEL_NVENC") {
            encoding = encoding.with_nvenc();
        }

        Self {
            work_root: std::env::var("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_root),
            words_per_cue: std::env::var("REEL_WORDS_PER_CUE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.words_per_cue),
            export_subtitles: env_flag("REEL_EXPORT_SUBTITLES"),
            keep_failed_artifacts: env_flag("REEL_KEEP_FAILED_ARTIFACTS"),
            title_template: std::env::var("REEL_TITLE_TEMPLATE").ok().map(PathBuf::from),
            style,
            encoding,
            // 0 disables the timeout
            tool_timeout_secs: match std::env::var("REEL_TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => defaults.tool_timeout_secs,
            },
        }
    }
}

/// One assembly invocation.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub background: PathBuf,
    pub narration: PathBuf,
    pub title: Option<String>,
    pub output: PathBuf,
    pub start: StartPolicy,
}

/// Result of a successful assembly.
#[derive(Debug, Clone)]
pub struct AssemblyOutcome {
    pub run_id: RunId,
    pub output: PathBuf,
    /// Duration of the final file in seconds
    pub duration: f64,
    /// Offset into the background the clip was cut from
    pub background_start: f64,
    pub cues: Vec<CaptionCue>,
    pub subtitles: Option<PathBuf>,
}

/// Drives the assembly stages over a [`MediaTool`] and a [`Transcriber`].
pub struct VideoAssembler<M, S> {
    tool: M,
    transcriber: S,
    config: AssemblyConfig,
}

impl<M, S> VideoAssembler<M, S>
where
    M: MediaTool,
    S: Transcriber,
{
    pub fn new(tool: M, transcriber: S, config: AssemblyConfig) -> Self {
        Self {
            tool,
            transcriber,
            config,
        }
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub fn tool(&self) -> &M {
        &self.tool
    }

    /// Assemble a narrated, captioned video.
    pub async fn assemble(&self, request: &AssemblyRequest) -> MediaResult<AssemblyOutcome> {
        let run_id = RunId::new();
        let span = info_span!("assemble", run_id = %run_id);
        let started = Instant::now();

        let result = self.run(run_id, request).instrument(span).await;

        metrics::record_assembly(started.elapsed().as_secs_f64(), result.is_ok());
        result
    }

    async fn run(&self, run_id: RunId, request: &AssemblyRequest) -> MediaResult<AssemblyOutcome> {
        info!(
            background = %request.background.display(),
            narration = %request.narration.display(),
            output = %request.output.display(),
            "Starting assembly"
        );

        let mut tracker = ArtifactTracker::create(&self.config.work_root, run_id.clone())
            .await?
            .keep_on_failure(self.config.keep_failed_artifacts);

        let background = MediaHandle::new(&request.background);
        let narration = MediaHandle::new(&request.narration);

        let target = run_stage(Stage::Probe, async {
            let narration_secs = narration.duration(&self.tool).await?;
            background.duration(&self.tool).await?;
            Ok::<_, MediaError>(narration_secs)
        })
        .await?;

        let trimmed_path = tracker.path(&format!("trimmed.{}", extension_of(&request.background)));
        let trimmed = run_stage(
            Stage::Trim,
            trim(&self.tool, &background, target, request.start, &trimmed_path),
        )
        .await?;

        let words = run_stage(
            Stage::Transcribe,
            self.transcriber.transcribe(narration.path(), tracker.dir()),
        )
        .await?;

        let cues = segment(&words, self.config.words_per_cue);
        metrics::record_caption_cues(cues.len());
        info!(words = words.len(), cues = cues.len(), "Segmented captions");

        let title = request
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| TitleCard {
                text: t.to_string(),
                template: self.config.title_template.clone(),
            });

        let silent_path = tracker.path("composite.mp4");
        let silent = run_stage(
            Stage::Render,
            composite(
                &self.tool,
                &trimmed.clip,
                title.as_ref(),
                &cues,
                &self.config.style,
                &silent_path,
            ),
        )
        .await?;

        // Written before the mux so a failure here still leaves `output` alone
        let staged_srt = if self.config.export_subtitles {
            let srt = tracker.path("captions.srt");
            write_srt(&cues, &srt).await?;
            Some(srt)
        } else {
            None
        };

        let staging = tracker.path("muxed.mp4");
        let final_video = run_stage(
            Stage::Mux,
            mux(&self.tool, &silent, narration.path(), &staging, &request.output),
        )
        .await?;

        let duration = run_stage(Stage::Probe, final_video.duration(&self.tool)).await?;

        // The video is committed; a subtitle that cannot be placed only costs the sidecar
        let subtitles = match staged_srt {
            Some(staged) => {
                let srt = request.output.with_extension("srt");
                match move_file(&staged, &srt).await {
                    Ok(()) => Some(srt),
                    Err(e) => {
                        warn!(path = %srt.display(), "Failed to export subtitles: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let removed = tracker.finish(Some(&request.output));
        metrics::record_artifacts_removed(removed);

        info!(
            output = %request.output.display(),
            duration = duration,
            "Assembly complete"
        );

        Ok(AssemblyOutcome {
            run_id,
            output: request.output.clone(),
            duration,
            background_start: trimmed.start,
            cues,
            subtitles,
        })
    }
}

/// Run one stage: attribute its errors, time it, and log failures.
async fn run_stage<T, F>(stage: Stage, fut: F) -> MediaResult<T>
where
    F: Future<Output = MediaResult<T>>,
{
    let started = Instant::now();
    let result = fut
        .instrument(info_span!("stage", stage = %stage))
        .await
        .map_err(|e| e.in_stage(stage));
    metrics::record_stage(stage, started.elapsed().as_secs_f64(), result.is_ok());

    if let Err(e) = &result {
        error!(stage = %stage, "Stage failed: {}", e);
    }
    result
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("mp4")
        .to_string()
}

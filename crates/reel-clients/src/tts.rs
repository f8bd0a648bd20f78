//! Narration via the piper TTS engine.
//!
//! piper reads the text on stdin and writes a WAV; ffmpeg then applies the
//! speaking-rate change and transcodes to the requested container.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use reel_media::command::run_tool;
use reel_media::{FfmpegCommand, FfmpegRunner};

use crate::error::{ClientError, ClientResult};
use crate::traits::SpeechSynthesizer;

/// Range of a single ffmpeg `atempo` stage.
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// piper and ffmpeg binaries.
#[derive(Debug, Clone)]
pub struct PiperConfig {
    pub binary: PathBuf,
    pub ffmpeg: PathBuf,
    pub timeout_secs: Option<u64>,
}

impl Default for PiperConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("piper"),
            ffmpeg: PathBuf::from("ffmpeg"),
            timeout_secs: Some(600),
        }
    }
}

impl PiperConfig {
    /// Load from `PIPER_BIN`, `FFMPEG_BIN` and `PIPER_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            binary: std::env::var("PIPER_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.binary),
            ffmpeg: std::env::var("FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg),
            timeout_secs: std::env::var("PIPER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(defaults.timeout_secs),
        }
    }
}

/// Voice selection for one synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    /// piper `.onnx` voice model
    pub model: PathBuf,
    /// Speaker index for multi-speaker models
    pub speaker: Option<u32>,
    /// Playback speed multiplier, 1.0 leaves the rate unchanged
    pub speed: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("voices/en_US-ryan-high.onnx"),
            speaker: None,
            speed: 1.0,
        }
    }
}

impl VoiceConfig {
    /// Load from `PIPER_VOICE`, `PIPER_SPEAKER` and `TTS_SPEED`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: std::env::var("PIPER_VOICE")
                .map(PathBuf::from)
                .unwrap_or(defaults.model),
            speaker: std::env::var("PIPER_SPEAKER")
                .ok()
                .and_then(|s| s.parse().ok()),
            speed: std::env::var("TTS_SPEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.speed),
        }
    }
}

/// `atempo` filter chain for a speed multiplier.
///
/// A single `atempo` stage only accepts 0.5..=2.0, so larger changes are
/// split across several stages. Returns `None` for an unchanged rate.
pub fn atempo_chain(speed: f64) -> ClientResult<Option<String>> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ClientError::InvalidInput(format!(
            "speech speed must be positive, got {}",
            speed
        )));
    }
    if (speed - 1.0).abs() < f64::EPSILON {
        return Ok(None);
    }

    let mut stages = Vec::new();
    let mut remaining = speed;
    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);

    Ok(Some(
        stages
            .iter()
            .map(|s| format!("atempo={}", s))
            .collect::<Vec<_>>()
            .join(","),
    ))
}

/// [`SpeechSynthesizer`] backed by piper.
pub struct PiperSynthesizer {
    config: PiperConfig,
}

impl PiperSynthesizer {
    pub fn new(config: PiperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PiperConfig {
        &self.config
    }

    /// Arguments for one piper invocation.
    pub fn build_args(&self, voice: &VoiceConfig, wav: &Path) -> Vec<String> {
        let mut args = vec![
            "--model".to_string(),
            voice.model.to_string_lossy().to_string(),
            "--output_file".to_string(),
            wav.to_string_lossy().to_string(),
        ];
        if let Some(speaker) = voice.speaker {
            args.push("--speaker".to_string());
            args.push(speaker.to_string());
        }
        args
    }

    fn transcode_command(wav: &Path, output: &Path, tempo: Option<String>) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(wav, output).no_video();
        match tempo {
            Some(filter) => cmd.audio_filter(filter),
            None => cmd,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig, output: &Path) -> ClientResult<PathBuf> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::InvalidInput("nothing to synthesize".to_string()));
        }
        let tempo = atempo_chain(voice.speed)?;

        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await?;

        // Removed with the raw WAV when dropped
        let scratch = tempfile::Builder::new()
            .prefix("piper-")
            .tempdir_in(&parent)?;
        let wav = scratch.path().join("speech.wav");

        info!(
            voice = %voice.model.display(),
            chars = text.chars().count(),
            "Synthesizing narration"
        );

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(self.build_args(voice, &wav));
        run_tool("piper", cmd, Some(text.as_bytes()), self.config.timeout_secs)
            .await
            .map_err(|e| ClientError::synthesis(e.to_string()))?;

        if !wav.is_file() {
            return Err(ClientError::synthesis(format!(
                "piper produced no audio at {}",
                wav.display()
            )));
        }

        debug!("Transcoding narration to {}", output.display());
        let transcode = Self::transcode_command(&wav, output, tempo);
        FfmpegRunner::new()
            .with_binary(&self.config.ffmpeg)
            .with_optional_timeout(self.config.timeout_secs)
            .run(&transcode)
            .await
            .map_err(|e| ClientError::synthesis(e.to_string()))?;

        Ok(output.to_path_buf())
    }
}

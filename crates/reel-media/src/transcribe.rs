//! Word-level transcription of narration audio.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use reel_models::WordTimestamp;

use crate::command::{resolve_tool, run_tool, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult, Stage};

/// Produces word timestamps for an audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio`, using `scratch_dir` for any intermediate files.
    ///
    /// Words come back trimmed, non-empty and in non-decreasing start order.
    /// Silence yields an empty vector.
    async fn transcribe(&self, audio: &Path, scratch_dir: &Path) -> MediaResult<Vec<WordTimestamp>>;
}

/// whisper.cpp settings.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// `whisper-cli` binary
    pub binary: PathBuf,
    /// ggml model file
    pub model: PathBuf,
    /// Spoken language, `auto` to detect
    pub language: String,
    pub threads: Option<u32>,
    /// ffmpeg used to normalize the input
    pub ffmpeg: PathBuf,
    pub timeout_secs: Option<u64>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("whisper-cli"),
            model: PathBuf::from("models/ggml-base.en.bin"),
            language: "en".to_string(),
            threads: None,
            ffmpeg: PathBuf::from("ffmpeg"),
            timeout_secs: None,
        }
    }
}

impl WhisperConfig {
    /// Load from `WHISPER_BIN`, `WHISPER_MODEL`, `WHISPER_LANGUAGE`,
    /// `WHISPER_THREADS` and `FFMPEG_BIN`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            binary: std::env::var("WHISPER_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.binary),
            model: std::env::var("WHISPER_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.model),
            language: std::env::var("WHISPER_LANGUAGE").unwrap_or(defaults.language),
            threads: std::env::var("WHISPER_THREADS")
                .ok()
                .and_then(|s| s.parse().ok()),
            ffmpeg: std::env::var("FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg),
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// [`Transcriber`] running whisper.cpp with one word per segment.
#[derive(Debug, Clone)]
pub struct WhisperCppTranscriber {
    config: WhisperConfig,
}

impl WhisperCppTranscriber {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    /// Arguments for one whisper-cli invocation.
    pub fn build_args(&self, wav: &Path, output_prefix: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.config.model.to_string_lossy().to_string(),
            "-f".to_string(),
            wav.to_string_lossy().to_string(),
            "-of".to_string(),
            output_prefix.to_string_lossy().to_string(),
            "-oj".to_string(),
            // One word per segment, split on word boundaries
            "-ml".to_string(),
            "1".to_string(),
            "-sow".to_string(),
            "-l".to_string(),
            self.config.language.clone(),
        ];
        if let Some(threads) = self.config.threads {
            args.push("-t".to_string());
            args.push(threads.to_string());
        }
        args
    }

    async fn normalize(&self, audio: &Path, wav: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(audio, wav)
            .no_video()
            .audio_sample_rate(16_000)
            .audio_channels(1)
            .audio_codec("pcm_s16le");
        FfmpegRunner::new()
            .with_binary(&self.config.ffmpeg)
            .with_optional_timeout(self.config.timeout_secs)
            .run(&cmd)
            .await
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(&self, audio: &Path, scratch_dir: &Path) -> MediaResult<Vec<WordTimestamp>> {
        if !audio.is_file() {
            return Err(MediaError::transcription(format!(
                "audio does not exist: {}",
                audio.display()
            )));
        }

        let binary = resolve_tool(&self.config.binary).map_err(|e| e.in_stage(Stage::Transcribe))?;

        // Removed when this call returns, whatever the outcome
        let scratch = tempfile::Builder::new()
            .prefix("whisper-")
            .tempdir_in(scratch_dir)
            .map_err(|e| MediaError::from(e).in_stage(Stage::Transcribe))?;
        let wav = scratch.path().join("narration-16k.wav");
        let prefix = scratch.path().join("words");

        self.normalize(audio, &wav)
            .await
            .map_err(|e| e.in_stage(Stage::Transcribe))?;

        let args = self.build_args(&wav, &prefix);
        debug!("Running whisper: {} {}", binary.display(), args.join(" "));

        let mut cmd = Command::new(&binary);
        cmd.args(&args);
        run_tool("whisper-cli", cmd, None, self.config.timeout_secs)
            .await
            .map_err(|e| e.in_stage(Stage::Transcribe))?;

        let json_path = prefix.with_extension("json");
        let raw = tokio::fs::read(&json_path).await.map_err(|e| {
            MediaError::transcription(format!(
                "whisper output {} not readable: {}",
                json_path.display(),
                e
            ))
        })?;

        let words = parse_whisper_json(&raw)?;
        info!(words = words.len(), "Transcribed narration");
        Ok(words)
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    #[serde(default)]
    text: String,
}

/// Segment bounds in milliseconds.
#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: i64,
    to: i64,
}

/// Parse whisper.cpp `-oj` output into word timestamps.
///
/// Empty tokens and bracketed non-speech markers such as `[BLANK_AUDIO]` are
/// dropped. Words are stably sorted by start time.
pub fn parse_whisper_json(raw: &[u8]) -> MediaResult<Vec<WordTimestamp>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let output: WhisperOutput = serde_json::from_slice(raw)
        .map_err(|e| MediaError::transcription(format!("unparseable whisper output: {}", e)))?;

    let mut words: Vec<WordTimestamp> = output
        .transcription
        .into_iter()
        .filter_map(|segment| {
            let text = segment.text.trim();
            if text.is_empty() || (text.starts_with('[') && text.ends_with(']')) {
                return None;
            }
            let start = segment.offsets.from.max(0) as f64 / 1000.0;
            let end = (segment.offsets.to.max(0) as f64 / 1000.0).max(start);
            Some(WordTimestamp::new(text, start, end))
        })
        .collect();

    words.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whisper_json() {
        let raw = br#"{
            "systeminfo": "AVX = 1",
            "transcription": [
                {"timestamps": {"from": "00:00:00,000", "to": "00:00:00,320"}, "offsets": {"from": 0, "to": 320}, "text": ""},
                {"timestamps": {"from": "00:00:00,320", "to": "00:00:00,640"}, "offsets": {"from": 320, "to": 640}, "text": " So"},
                {"timestamps": {"from": "00:00:00,640", "to": "00:00:01,010"}, "offsets": {"from": 640, "to": 1010}, "text": " there"},
                {"timestamps": {"from": "00:00:01,010", "to": "00:00:01,500"}, "offsets": {"from": 1010, "to": 1500}, "text": " I was."}
            ]
        }"#;
        let words = parse_whisper_json(raw).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], WordTimestamp::new("So", 0.32, 0.64));
        assert_eq!(words[2].text, "I was.");
        assert_eq!(words[2].end, 1.5);
    }

    #[test]
    fn test_parse_drops_markers_and_sorts() {
        let raw = br#"{"transcription": [
            {"offsets": {"from": 900, "to": 1200}, "text": " later"},
            {"offsets": {"from": 0, "to": 500}, "text": "[BLANK_AUDIO]"},
            {"offsets": {"from": 100, "to": 400}, "text": " first"},
            {"offsets": {"from": 900, "to": 950}, "text": " tie"}
        ]}"#;
        let words = parse_whisper_json(raw).unwrap();
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "later", "tie"]);
        assert!(words.iter().all(WordTimestamp::is_well_formed));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_whisper_json(b"").unwrap().is_empty());
        assert!(parse_whisper_json(br#"{"transcription": []}"#).unwrap().is_empty());
        assert!(parse_whisper_json(br#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_transcription_error() {
        assert!(matches!(
            parse_whisper_json(b"whisper_init: failed"),
            Err(MediaError::Transcription { .. })
        ));
    }

    #[test]
    fn test_build_args() {
        let transcriber = WhisperCppTranscriber::new(WhisperConfig {
            threads: Some(4),
            ..Default::default()
        });
        let args = transcriber.build_args(Path::new("/tmp/in.wav"), Path::new("/tmp/words"));
        assert!(args.windows(2).any(|w| w == ["-ml", "1"]));
        assert!(args.contains(&"-sow".to_string()));
        assert!(args.contains(&"-oj".to_string()));
        assert!(args.windows(2).any(|w| w == ["-of", "/tmp/words"]));
        assert!(args.windows(2).any(|w| w == ["-t", "4"]));
    }

    #[tokio::test]
    async fn test_missing_audio_is_transcription_error() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = WhisperCppTranscriber::new(WhisperConfig::default());
        let err = transcriber
            .transcribe(Path::new("/nonexistent/voice.mp3"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Transcription { .. }));
    }
}

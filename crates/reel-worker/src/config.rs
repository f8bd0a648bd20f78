//! Worker configuration.

use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;

use reel_clients::VoiceConfig;
use reel_media::AssemblyConfig;
use reel_models::PrivacyStatus;

use crate::error::{WorkerError, WorkerResult};

const DEFAULT_BACKGROUNDS: &[&str] = &["minecraft.mp4", "gta.mp4", "surfers.mp4"];

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Background gameplay videos, one is picked per run
    pub backgrounds: Vec<PathBuf>,
    /// Final video path, overwritten by every run
    pub output: PathBuf,
    /// Run history, one line appended per completed run
    pub history_file: PathBuf,
    /// Start the background clip at a random offset
    pub random_start: bool,
    /// Publish the assembled video
    pub upload: bool,
    pub privacy: PrivacyStatus,
    pub voice: VoiceConfig,
    pub assembly: AssemblyConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            backgrounds: DEFAULT_BACKGROUNDS.iter().map(PathBuf::from).collect(),
            output: PathBuf::from("finalOutput.mp4"),
            history_file: PathBuf::from("lastExecuted.txt"),
            random_start: true,
            upload: true,
            privacy: PrivacyStatus::Public,
            voice: VoiceConfig::default(),
            assembly: AssemblyConfig::default(),
        }
    }
}

fn parse_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let backgrounds = match std::env::var("REEL_BACKGROUNDS") {
            Ok(raw) => parse_list(&raw),
            Err(_) => defaults.backgrounds,
        };

        let privacy = match std::env::var("REEL_PRIVACY") {
            Ok(raw) => raw
                .parse::<PrivacyStatus>()
                .map_err(WorkerError::config_error)?,
            Err(_) => defaults.privacy,
        };

        Ok(Self {
            backgrounds,
            output: std::env::var("REEL_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.output),
            history_file: std::env::var("REEL_HISTORY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_file),
            random_start: std::env::var("REEL_RANDOM_START")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.random_start),
            upload: defaults.upload,
            privacy,
            voice: VoiceConfig::from_env(),
            assembly: AssemblyConfig::from_env(),
        })
    }

    /// Pick one of the configured backgrounds that exists on disk.
    pub fn choose_background(&self) -> WorkerResult<&Path> {
        let available: Vec<&PathBuf> = self.backgrounds.iter().filter(|p| p.is_file()).collect();
        available
            .choose(&mut rand::rng())
            .copied()
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                WorkerError::config_error(format!(
                    "none of the background videos exist: {:?}",
                    self.backgrounds
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" a.mp4, ,b.mp4,"),
            vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_choose_background_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("gta.mp4");
        std::fs::write(&present, b"x").unwrap();

        let config = WorkerConfig {
            backgrounds: vec![dir.path().join("minecraft.mp4"), present.clone()],
            ..Default::default()
        };
        for _ in 0..10 {
            assert_eq!(config.choose_background().unwrap(), present.as_path());
        }
    }

    #[test]
    fn test_choose_background_none_available() {
        let config = WorkerConfig {
            backgrounds: vec![PathBuf::from("/nonexistent/bg.mp4")],
            ..Default::default()
        };
        assert!(matches!(
            config.choose_background(),
            Err(WorkerError::ConfigError(_))
        ));
    }
}

//! Seams between the worker and the outside services.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use reel_models::{Story, UploadMetadata};

use crate::error::ClientResult;
use crate::tts::VoiceConfig;

/// Produces a story from a prompt.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    async fn generate_story(&self, prompt: &str) -> ClientResult<Story>;
}

/// Turns text into a narration audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Write narration of `text` to `output` and return its path.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig, output: &Path) -> ClientResult<PathBuf>;
}

/// Publishes a finished video.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Upload `file` and return the remote video id.
    async fn publish(&self, file: &Path, metadata: &UploadMetadata) -> ClientResult<String>;
}

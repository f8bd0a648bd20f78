//! Clients for the services around the assembly pipeline.
//!
//! - [`GeminiClient`] writes the story
//! - [`PiperSynthesizer`] narrates it
//! - [`YouTubePublisher`] uploads the finished video
//! - [`TopicCatalog`] picks what the story is about

pub mod catalog;
pub mod error;
pub mod gemini;
pub mod traits;
pub mod tts;
pub mod youtube;

pub use catalog::{upload_title, Topic, TopicCatalog};
pub use error::{ClientError, ClientResult};
pub use gemini::{parse_story, render_prompt, GeminiClient, GeminiConfig};
pub use traits::{Publisher, SpeechSynthesizer, StoryGenerator};
pub use tts::{atempo_chain, PiperConfig, PiperSynthesizer, VoiceConfig};
pub use youtube::{YouTubeConfig, YouTubePublisher};

//! Shared data models for the StoryReel pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Word-level transcript timestamps and caption cues
//! - SRT timestamp formatting and parsing
//! - Encoding configuration
//! - Generated stories and upload metadata
//! - Run identifiers

pub mod caption;
pub mod encoding;
pub mod run;
pub mod story;
pub mod timestamp;
pub mod transcript;

// Re-export common types
pub use caption::CaptionCue;
pub use encoding::EncodingConfig;
pub use run::RunId;
pub use story::{PrivacyStatus, Story, UploadMetadata};
pub use timestamp::{format_srt_timestamp, parse_srt_timestamp, TimestampError};
pub use transcript::WordTimestamp;

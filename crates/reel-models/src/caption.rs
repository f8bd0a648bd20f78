//! Caption cue model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::format_srt_timestamp;

/// A single caption entry shown on screen for a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionCue {
    /// 1-based position in the cue sequence
    pub index: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Space-joined words
    pub text: String,
}

impl CaptionCue {
    /// Number of words in the cue text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Render this cue as one SRT block (including the trailing blank line).
    pub fn to_srt_block(&self) -> String {
        format!(
            "{}\n{} --> {}\n{}\n\n",
            self.index,
            format_srt_timestamp(self.start),
            format_srt_timestamp(self.end),
            self.text
        )
    }
}

//! Generated story and upload metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum title length accepted by the hosting platform.
pub const MAX_TITLE_CHARS: usize = 100;
/// Maximum description length accepted by the hosting platform.
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
/// Default category ("People & Blogs").
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// A generated story: the on-screen title and the narrated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Story {
    /// Short question-style title shown on the title card
    pub title: String,
    /// Narrated story text
    pub body: String,
}

impl Story {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Visibility of an uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyStatus {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrivacyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(PrivacyStatus::Public),
            "private" => Ok(PrivacyStatus::Private),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            other => Err(format!("unknown privacy status: {}", other)),
        }
    }
}

/// Metadata attached to a published video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    #[serde(default)]
    pub privacy: PrivacyStatus,
    /// Existing playlist to add the video to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}

fn default_category_id() -> String {
    DEFAULT_CATEGORY_ID.to_string()
}

impl UploadMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            category_id: default_category_id(),
            privacy: PrivacyStatus::default(),
            playlist_id: None,
        }
    }

    /// Validate the metadata against platform limits.
    pub fn validate(&self) -> Result<(), String> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            return Err("title cannot be empty".to_string());
        }
        if title_len > MAX_TITLE_CHARS {
            return Err(format!(
                "title is {} characters, maximum is {}",
                title_len, MAX_TITLE_CHARS
            ));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(format!(
                "description exceeds {} characters",
                MAX_DESCRIPTION_CHARS
            ));
        }
        // The platform rejects angle brackets in titles and descriptions
        if self.title.contains(['<', '>']) || self.description.contains(['<', '>']) {
            return Err("title and description cannot contain '<' or '>'".to_string());
        }
        Ok(())
    }
}

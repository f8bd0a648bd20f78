//! Gemini client for story generation.
//!
//! The model is asked for a `~`-delimited answer:
//! `<anything>~<title question>~<story>`. Field 1 becomes the title card,
//! field 2 the narration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reel_models::Story;

use crate::error::{ClientError, ClientResult};
use crate::traits::StoryGenerator;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.0-flash"];

/// Prompt used when `GEMINI_QUESTION_PROMPT` is not set.
pub const DEFAULT_PROMPT: &str = "Write a first-person story in the style of the {subreddit} \
subreddit. Answer in exactly this format: STORY~<a short question that hooks the viewer>~<the \
story, 150 to 250 words, plain text, no markdown>. Do not use the ~ character anywhere else.";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Models tried in order until one produces a usable story
    pub models: Vec<String>,
    pub base_url: String,
    pub timeout: Duration,
    /// Template with a `{subreddit}` placeholder
    pub prompt_template: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            prompt_template: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Create config from environment variables.
    ///
    /// `GEMINI_MODEL` is tried first, ahead of the built-in fallbacks.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClientError::config("GEMINI_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config = config.with_primary_model(model);
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(prompt) = std::env::var("GEMINI_QUESTION_PROMPT") {
            config.prompt_template = prompt;
        }
        if let Some(secs) = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Put `model` at the front of the fallback list.
    pub fn with_primary_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.models.retain(|m| *m != model);
        self.models.insert(0, model);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Substitute the topic into a prompt template.
pub fn render_prompt(template: &str, topic: &str) -> String {
    template.replace("{subreddit}", topic)
}

/// Split a `~`-delimited answer into a story.
pub fn parse_story(answer: &str) -> ClientResult<Story> {
    let fields: Vec<&str> = answer.split('~').collect();
    if fields.len() < 3 {
        return Err(ClientError::invalid_response(format!(
            "expected at least 3 '~'-separated fields, got {}",
            fields.len()
        )));
    }

    let title = fields[1].trim();
    let body = fields[2].trim();
    if title.is_empty() {
        return Err(ClientError::invalid_response("story title is empty"));
    }
    if body.is_empty() {
        return Err(ClientError::invalid_response("story body is empty"));
    }

    Ok(Story::new(title, body))
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Prompt for a story about `topic`.
    pub fn prompt_for(&self, topic: &str) -> String {
        render_prompt(&self.config.prompt_template, topic)
    }

    /// Send the prompt to one model and return the raw answer text.
    async fn call_model(&self, model: &str, prompt: &str) -> ClientResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!("Sending Gemini request to {}", url);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::request_failed(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let body: GeminiResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ClientError::invalid_response("Gemini returned no text"));
        }
        Ok(text)
    }
}

#[async_trait]
impl StoryGenerator for GeminiClient {
    async fn generate_story(&self, prompt: &str) -> ClientResult<Story> {
        let mut last_error = None;

        for model in &self.config.models {
            info!("Generating story with model {}", model);

            let result = match self.call_model(model, prompt).await {
                Ok(answer) => parse_story(&answer),
                Err(e) => Err(e),
            };

            match result {
                Ok(story) => {
                    info!(model = %model, title = %story.title, "Story generated");
                    return Ok(story);
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ClientError::config("no Gemini models configured")))
    }
}

//! YouTube Data API publisher.
//!
//! Authenticates with a stored OAuth refresh token, uploads through the
//! resumable upload protocol and optionally files the video into a playlist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reel_models::UploadMetadata;

use crate::error::{ClientError, ClientResult};
use crate::traits::Publisher;

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Publisher configuration.
///
/// Credentials are optional here so that a worker running with
/// `--no-upload` never needs them; [`YouTubePublisher`] reports
/// [`ClientError::Auth`] when it actually has to authenticate.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_url: String,
    /// Serves both `/youtube/v3/...` and `/upload/youtube/v3/...`
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(1800),
        }
    }
}

/// Stored OAuth credentials in Google's authorized-user format.
#[derive(Debug, Deserialize)]
struct TokenFile {
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: Option<String>,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl YouTubeConfig {
    /// Create config from environment variables.
    ///
    /// `CLIENT_ID`, `CLIENT_SECRET` and `YOUTUBE_REFRESH_TOKEN` take
    /// precedence; anything missing is read from the token file
    /// (`YOUTUBE_TOKEN_FILE`, default `token.json`) when it exists.
    pub fn from_env() -> ClientResult<Self> {
        let mut config = Self {
            client_id: non_empty_env("CLIENT_ID"),
            client_secret: non_empty_env("CLIENT_SECRET"),
            refresh_token: non_empty_env("YOUTUBE_REFRESH_TOKEN"),
            ..Default::default()
        };

        let token_file = PathBuf::from(
            std::env::var("YOUTUBE_TOKEN_FILE").unwrap_or_else(|_| "token.json".to_string()),
        );
        if token_file.is_file() {
            config = config.with_token_file(&token_file)?;
        }

        if let Some(url) = non_empty_env("YOUTUBE_TOKEN_URL") {
            config.token_url = url;
        }
        if let Some(base) = non_empty_env("YOUTUBE_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    /// Fill missing credentials from an authorized-user JSON file.
    pub fn with_token_file(mut self, path: &Path) -> ClientResult<Self> {
        let raw = std::fs::read(path)?;
        let stored: TokenFile = serde_json::from_slice(&raw)?;

        self.refresh_token = self.refresh_token.or(stored.refresh_token);
        self.client_id = self.client_id.or(stored.client_id);
        self.client_secret = self.client_secret.or(stored.client_secret);
        if let Some(uri) = stored.token_uri {
            self.token_url = uri;
        }
        Ok(self)
    }

    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet<'a> {
    title: &'a str,
    description: &'a str,
    tags: &'a [String],
    category_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus<'a> {
    privacy_status: &'a str,
}

#[derive(Debug, Serialize)]
struct VideoResource<'a> {
    snippet: VideoSnippet<'a>,
    status: VideoStatus<'a>,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet<'a> {
    playlist_id: &'a str,
    resource_id: ResourceId<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId<'a> {
    kind: &'static str,
    video_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PlaylistItem<'a> {
    snippet: PlaylistItemSnippet<'a>,
}

/// [`Publisher`] for YouTube.
pub struct YouTubePublisher {
    http: Client,
    config: YouTubeConfig,
}

impl YouTubePublisher {
    pub fn new(config: YouTubeConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(YouTubeConfig::from_env()?)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Exchange the refresh token for a short-lived access token.
    pub async fn access_token(&self) -> ClientResult<String> {
        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
            self.config.refresh_token.as_deref(),
        ) else {
            return Err(ClientError::auth(
                "CLIENT_ID, CLIENT_SECRET and a refresh token are required",
            ));
        };

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::auth(format!(
                "token refresh returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Open a resumable upload session and return its URL.
    async fn start_upload(
        &self,
        token: &str,
        metadata: &UploadMetadata,
        size: u64,
    ) -> ClientResult<String> {
        let resource = VideoResource {
            snippet: VideoSnippet {
                title: &metadata.title,
                description: &metadata.description,
                tags: &metadata.tags,
                category_id: &metadata.category_id,
            },
            status: VideoStatus {
                privacy_status: metadata.privacy.as_str(),
            },
        };

        let response = self
            .http
            .post(self.api_url("/upload/youtube/v3/videos"))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", size.to_string())
            .json(&resource)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::request_failed(format!(
                "upload session returned {}: {}",
                status, body
            )));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| ClientError::invalid_response("upload session has no Location header"))
    }

    /// Stream `file` into an open upload session.
    async fn upload_file(&self, token: &str, session: &str, file: &Path, size: u64) -> ClientResult<String> {
        let file = tokio::fs::File::open(file).await?;
        let response = self
            .http
            .put(session)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "video/*")
            .header(CONTENT_LENGTH, size)
            .body(Body::from(file))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::request_failed(format!(
                "upload returned {}: {}",
                status, body
            )));
        }

        let video: UploadedVideo = response.json().await?;
        Ok(video.id)
    }

    /// Add an uploaded video to a playlist.
    pub async fn add_to_playlist(&self, token: &str, playlist_id: &str, video_id: &str) -> ClientResult<()> {
        let item = PlaylistItem {
            snippet: PlaylistItemSnippet {
                playlist_id,
                resource_id: ResourceId {
                    kind: "youtube#video",
                    video_id,
                },
            },
        };

        let response = self
            .http
            .post(self.api_url("/youtube/v3/playlistItems"))
            .query(&[("part", "snippet")])
            .bearer_auth(token)
            .json(&item)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::request_failed(format!(
                "playlist insert returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    async fn publish(&self, file: &Path, metadata: &UploadMetadata) -> ClientResult<String> {
        metadata.validate().map_err(ClientError::InvalidInput)?;
        if !file.is_file() {
            return Err(ClientError::InvalidInput(format!(
                "video file not found: {}",
                file.display()
            )));
        }

        let token = self.access_token().await?;

        let size = tokio::fs::metadata(file).await?.len();
        info!(
            file = %file.display(),
            bytes = size,
            privacy = %metadata.privacy,
            "Uploading video"
        );

        let session = self.start_upload(&token, metadata, size).await?;
        debug!("Upload session opened");
        let video_id = self.upload_file(&token, &session, file, size).await?;
        info!(video_id = %video_id, "Upload complete");

        if let Some(playlist_id) = &metadata.playlist_id {
            // The video is already live; a playlist failure does not undo that
            match self.add_to_playlist(&token, playlist_id, &video_id).await {
                Ok(()) => info!(playlist_id = %playlist_id, "Added video to playlist"),
                Err(e) => warn!(playlist_id = %playlist_id, "Failed to add video to playlist: {}", e),
            }
        }

        Ok(video_id)
    }
}

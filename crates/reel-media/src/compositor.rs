//! Composite rendering: background clip, title card and timed captions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use reel_models::CaptionCue;

use crate::error::{MediaError, MediaResult, Stage};
use crate::media::MediaHandle;
use crate::render_graph::{LayerId, RenderGraph};
use crate::text::{wrap_words, Position, TextStyle, TimeWindow, TITLE_WRAP_WIDTH};
use crate::tool::MediaTool;

/// Title shown for the whole clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleCard {
    pub text: String,
    /// Card image the title is drawn onto; without one the title is drawn
    /// directly on the video.
    #[serde(default)]
    pub template: Option<PathBuf>,
}

impl TitleCard {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            template: None,
        }
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }
}

/// Styling of the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeStyle {
    pub title: TextStyle,
    pub caption: TextStyle,
    /// Pixels below the vertical center where captions sit
    pub caption_offset: u32,
    /// Maximum characters per title line
    pub title_wrap_width: usize,
}

impl Default for CompositeStyle {
    fn default() -> Self {
        Self {
            title: TextStyle::title(),
            caption: TextStyle::caption(),
            caption_offset: 20,
            title_wrap_width: TITLE_WRAP_WIDTH,
        }
    }
}

/// Build the layer graph for a composite.
///
/// Layer order: base clip, title (when present), then one caption layer per
/// cue in index order, each enabled only during its cue window.
pub fn build_graph(
    clip: &Path,
    clip_duration: f64,
    title: Option<&TitleCard>,
    cues: &[CaptionCue],
    style: &CompositeStyle,
) -> MediaResult<(RenderGraph, LayerId)> {
    let mut graph = RenderGraph::new();
    let mut top = graph.add_source(clip);
    let whole_clip = TimeWindow::new(0.0, clip_duration);

    if let Some(title) = title {
        let wrapped = wrap_words(&title.text, style.title_wrap_width).join("\n");
        if !wrapped.is_empty() {
            top = match &title.template {
                Some(template) => {
                    let card = graph.add_source(template);
                    let card = graph.add_text(
                        card,
                        wrapped,
                        style.title.clone(),
                        Position::centered(),
                        None,
                    )?;
                    graph.add_overlay(top, card, Position::origin(), Some(whole_clip))?
                }
                // No card to hold it: keep the title above the caption band
                None => graph.add_text(
                    top,
                    wrapped,
                    style.title.clone(),
                    Position::upper_band(),
                    Some(whole_clip),
                )?,
            };
        }
    }

    for cue in cues {
        top = graph.add_text(
            top,
            cue.text.as_str(),
            style.caption.clone(),
            Position::centered_below(style.caption_offset),
            Some(TimeWindow::new(cue.start, cue.end)),
        )?;
    }

    Ok((graph, top))
}

/// Render the composite to a video-only file at `output`.
pub async fn composite<T>(
    tool: &T,
    clip: &MediaHandle,
    title: Option<&TitleCard>,
    cues: &[CaptionCue],
    style: &CompositeStyle,
    output: &Path,
) -> MediaResult<MediaHandle>
where
    T: MediaTool + ?Sized,
{
    if !clip.exists() {
        return Err(MediaError::ArtifactMissing(clip.path().to_path_buf()));
    }
    if let Some(template) = title.and_then(|t| t.template.as_deref()) {
        if !template.is_file() {
            return Err(MediaError::ArtifactMissing(template.to_path_buf()));
        }
    }

    let clip_duration = clip.duration(tool).await?;
    let (graph, root) = build_graph(clip.path(), clip_duration, title, cues, style)
        .map_err(|e| MediaError::render(e.to_string()))?;
    let job = graph
        .into_job(root, output, clip_duration)
        .map_err(|e| MediaError::render(e.to_string()))?;

    info!(
        layers = job.filter_complex.split(';').count(),
        captions = cues.len(),
        titled = title.is_some(),
        "Rendering composite"
    );

    tool.render(&job)
        .await
        .map_err(|e| e.in_stage(Stage::Render))?;

    if !output.is_file() {
        return Err(MediaError::render(format!(
            "renderer produced no file at {}",
            output.display()
        )));
    }

    Ok(MediaHandle::new(output))
}

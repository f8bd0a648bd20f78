//! Layered render graph compiled to an ffmpeg filter graph.
//!
//! Layers reference only layers created before them, so every graph is a DAG.
//! Each layer may be consumed by at most one other layer.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};
use crate::text::{drawtext_filter, Position, TextStyle, TimeWindow};
use crate::tool::RenderJob;

/// Handle to a layer within one [`RenderGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(usize);

/// A node of the render graph.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderLayer {
    /// Video stream of a file input.
    Source { input: usize },
    /// Text drawn over one parent layer.
    TextOverlay {
        parent: LayerId,
        text: String,
        style: TextStyle,
        position: Position,
        window: Option<TimeWindow>,
    },
    /// `top` composited over `base`.
    Overlay {
        base: LayerId,
        top: LayerId,
        position: Position,
        window: Option<TimeWindow>,
    },
}

impl RenderLayer {
    fn parents(&self) -> Vec<LayerId> {
        match self {
            RenderLayer::Source { .. } => Vec::new(),
            RenderLayer::TextOverlay { parent, .. } => vec![*parent],
            RenderLayer::Overlay { base, top, .. } => vec![*base, *top],
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderGraph {
    inputs: Vec<PathBuf>,
    layers: Vec<RenderLayer>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn layers(&self) -> &[RenderLayer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&RenderLayer> {
        self.layers.get(id.0)
    }

    /// Add a file input and a source layer for its video stream.
    pub fn add_source(&mut self, path: impl AsRef<Path>) -> LayerId {
        self.inputs.push(path.as_ref().to_path_buf());
        self.push(RenderLayer::Source {
            input: self.inputs.len() - 1,
        })
    }

    /// Draw text over `parent`.
    pub fn add_text(
        &mut self,
        parent: LayerId,
        text: impl Into<String>,
        style: TextStyle,
        position: Position,
        window: Option<TimeWindow>,
    ) -> MediaResult<LayerId> {
        self.check(parent)?;
        Ok(self.push(RenderLayer::TextOverlay {
            parent,
            text: text.into(),
            style,
            position,
            window,
        }))
    }

    /// Composite `top` over `base`.
    pub fn add_overlay(
        &mut self,
        base: LayerId,
        top: LayerId,
        position: Position,
        window: Option<TimeWindow>,
    ) -> MediaResult<LayerId> {
        self.check(base)?;
        self.check(top)?;
        if base == top {
            return Err(MediaError::InvalidInput(
                "overlay needs two distinct layers".to_string(),
            ));
        }
        Ok(self.push(RenderLayer::Overlay {
            base,
            top,
            position,
            window,
        }))
    }

    fn push(&mut self, layer: RenderLayer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    fn check(&self, id: LayerId) -> MediaResult<()> {
        if id.0 < self.layers.len() {
            Ok(())
        } else {
            Err(MediaError::InvalidInput(format!("unknown layer {}", id.0)))
        }
    }

    fn label(&self, id: LayerId) -> String {
        match &self.layers[id.0] {
            RenderLayer::Source { input } => format!("[{}:v]", input),
            _ => format!("[l{}]", id.0),
        }
    }

    /// Compile the subgraph reachable from `root`.
    ///
    /// Returns the `-filter_complex` string and the label to map.
    pub fn to_filter_complex(&self, root: LayerId) -> MediaResult<(String, String)> {
        self.check(root)?;

        // Walk back from the root, counting how often each layer is consumed
        let mut reachable = vec![false; self.layers.len()];
        let mut consumers = vec![0usize; self.layers.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if reachable[id.0] {
                continue;
            }
            reachable[id.0] = true;
            for parent in self.layers[id.0].parents() {
                consumers[parent.0] += 1;
                stack.push(parent);
            }
        }

        if let Some(shared) = consumers.iter().position(|&n| n > 1) {
            return Err(MediaError::InvalidInput(format!(
                "layer {} is consumed more than once",
                shared
            )));
        }

        let mut chains = Vec::new();
        for (i, layer) in self.layers.iter().enumerate() {
            if !reachable[i] {
                continue;
            }
            let out = format!("[l{}]", i);
            match layer {
                RenderLayer::Source { input } => {
                    // A bare source only needs a filter when it is the output
                    if i == root.0 {
                        chains.push(format!("[{}:v]null{}", input, out));
                    }
                }
                RenderLayer::TextOverlay {
                    parent,
                    text,
                    style,
                    position,
                    window,
                } => {
                    chains.push(format!(
                        "{}{}{}",
                        self.label(*parent),
                        drawtext_filter(text, style, position, *window),
                        out
                    ));
                }
                RenderLayer::Overlay {
                    base,
                    top,
                    position,
                    window,
                } => {
                    let mut filter = format!("overlay=x={}:y={}", position.x, position.y);
                    if let Some(window) = window {
                        filter.push_str(":enable=");
                        filter.push_str(&window.enable_expr());
                    }
                    chains.push(format!(
                        "{}{}{}{}",
                        self.label(*base),
                        self.label(*top),
                        filter,
                        out
                    ));
                }
            }
        }

        Ok((chains.join(";"), format!("[l{}]", root.0)))
    }

    /// Build a render job writing the graph rooted at `root` to `output`.
    pub fn into_job(self, root: LayerId, output: impl AsRef<Path>, duration: f64) -> MediaResult<RenderJob> {
        let (filter_complex, output_label) = self.to_filter_complex(root)?;
        Ok(RenderJob {
            inputs: self.inputs,
            filter_complex,
            output_label,
            output: output.as_ref().to_path_buf(),
            duration,
        })
    }
}

//! Error types for media operations.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Pipeline stage, used to attribute low-level tool failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Probe,
    Trim,
    Transcribe,
    Render,
    Mux,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Probe => "probe",
            Stage::Trim => "trim",
            Stage::Transcribe => "transcribe",
            Stage::Render => "render",
            Stage::Mux => "mux",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("{tool} command failed: {message}{}", stderr_suffix(.stderr))]
    ToolFailed {
        tool: String,
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Probe failed: {message}{}", stderr_suffix(.stderr))]
    Probe {
        message: String,
        stderr: Option<String>,
    },

    #[error(
        "Background too short: needs {required:.3}s from {start:.3}s but only {available:.3}s available"
    )]
    InsufficientLength {
        available: f64,
        required: f64,
        start: f64,
    },

    #[error("Trim failed: {message}{}", stderr_suffix(.stderr))]
    Trim {
        message: String,
        stderr: Option<String>,
    },

    #[error("Transcription failed: {message}{}", stderr_suffix(.stderr))]
    Transcription {
        message: String,
        stderr: Option<String>,
    },

    #[error("Render failed: {message}{}", stderr_suffix(.stderr))]
    Render {
        message: String,
        stderr: Option<String>,
    },

    #[error("Mux failed: {message}{}", stderr_suffix(.stderr))]
    Mux {
        message: String,
        stderr: Option<String>,
    },

    #[error("Required artifact missing: {0}")]
    ArtifactMissing(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

fn stderr_suffix(stderr: &Option<String>) -> String {
    match stderr {
        Some(s) if !s.trim().is_empty() => format!("\n--- tool output ---\n{}", s.trim_end()),
        _ => String::new(),
    }
}

impl MediaError {
    /// Create a tool failure error.
    pub fn tool_failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a stage error of the given kind.
    pub fn stage(stage: Stage, message: impl Into<String>, stderr: Option<String>) -> Self {
        let message = message.into();
        match stage {
            Stage::Probe => Self::Probe { message, stderr },
            Stage::Trim => Self::Trim { message, stderr },
            Stage::Transcribe => Self::Transcription { message, stderr },
            Stage::Render => Self::Render { message, stderr },
            Stage::Mux => Self::Mux { message, stderr },
        }
    }

    /// Create a probe failure error.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::stage(Stage::Probe, message, None)
    }

    /// Create a transcription failure error.
    pub fn transcription(message: impl Into<String>) -> Self {
        Self::stage(Stage::Transcribe, message, None)
    }

    /// Create a render failure error.
    pub fn render(message: impl Into<String>) -> Self {
        Self::stage(Stage::Render, message, None)
    }

    /// Create a mux failure error.
    pub fn mux(message: impl Into<String>) -> Self {
        Self::stage(Stage::Mux, message, None)
    }

    /// Re-attribute a plumbing error (tool failure, timeout, IO) to a stage.
    ///
    /// Errors that already carry a stage kind pass through unchanged.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Self::ToolFailed {
                tool,
                message,
                stderr,
                exit_code,
            } => {
                let message = match exit_code {
                    Some(code) => format!("{} ({} exit code {})", message, tool, code),
                    None => format!("{} ({})", message, tool),
                };
                Self::stage(stage, message, stderr)
            }
            Self::ToolNotFound(tool) => Self::stage(stage, format!("{} not found in PATH", tool), None),
            Self::Timeout(secs) => Self::stage(stage, format!("timed out after {} seconds", secs), None),
            Self::Io(e) => Self::stage(stage, format!("IO error: {}", e), None),
            Self::JsonParse(e) => Self::stage(stage, format!("unparseable tool output: {}", e), None),
            other => other,
        }
    }

    /// The stage this error is attributed to, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Probe { .. } => Some(Stage::Probe),
            Self::InsufficientLength { .. } | Self::Trim { .. } => Some(Stage::Trim),
            Self::Transcription { .. } => Some(Stage::Transcribe),
            Self::Render { .. } => Some(Stage::Render),
            Self::Mux { .. } => Some(Stage::Mux),
            _ => None,
        }
    }

    /// True when the inputs can never be assembled as given.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InsufficientLength { .. } | Self::InvalidInput(_))
    }

    /// Diagnostic output captured from the underlying tool, if any.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::ToolFailed { stderr, .. }
            | Self::Probe { stderr, .. }
            | Self::Trim { stderr, .. }
            | Self::Transcription { stderr, .. }
            | Self::Render { stderr, .. }
            | Self::Mux { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

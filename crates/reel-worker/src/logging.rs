//! Structured run logging.
//!
//! A run owns one `run` span carrying `run_id`, the chosen `topic` and the
//! current `phase`. Topic and phase are recorded on the span as the run
//! advances, so every event emitted inside it, including the media stage
//! logs, can be attributed from JSON logs alone.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use tracing::field::Empty;
use tracing::{error, info, warn, Span};

use reel_models::RunId;

use crate::error::WorkerError;

/// Coarse steps of a worker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Topic,
    Story,
    Narration,
    Assembly,
    Publish,
    History,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Topic => "topic",
            RunPhase::Story => "story",
            RunPhase::Narration => "narration",
            RunPhase::Assembly => "assembly",
            RunPhase::Publish => "publish",
            RunPhase::History => "history",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger for one worker run.
#[derive(Debug)]
pub struct RunLogger {
    run_id: String,
    span: Span,
    phase: Mutex<Option<RunPhase>>,
    started: Instant,
}

impl RunLogger {
    pub fn new(run_id: &RunId) -> Self {
        let run_id = run_id.to_string();
        let span = tracing::info_span!("run", run_id = %run_id, topic = Empty, phase = Empty);
        Self {
            run_id,
            span,
            phase: Mutex::new(None),
            started: Instant::now(),
        }
    }

    /// Span that the run and its nested stage spans execute in.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn phase(&self) -> Option<RunPhase> {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_topic(&self, topic: &str) {
        self.span.record("topic", topic);
        let _entered = self.span.enter();
        info!("Run started");
    }

    pub fn enter_phase(&self, phase: RunPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = Some(phase);
        self.span.record("phase", phase.as_str());
    }

    pub fn progress(&self, message: &str) {
        let _entered = self.span.enter();
        info!(elapsed_secs = self.elapsed_secs(), "{}", message);
    }

    pub fn warning(&self, message: &str) {
        let _entered = self.span.enter();
        warn!(elapsed_secs = self.elapsed_secs(), "{}", message);
    }

    pub fn failed(&self, err: &WorkerError) {
        let _entered = self.span.enter();
        let phase = self.phase().map(|p| p.as_str()).unwrap_or("setup");
        error!(
            failed_phase = phase,
            exit_code = err.exit_code(),
            elapsed_secs = self.elapsed_secs(),
            "Run failed: {}", err
        );
    }

    pub fn completed(&self) {
        let _entered = self.span.enter();
        info!(elapsed_secs = self.elapsed_secs(), "Run completed");
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

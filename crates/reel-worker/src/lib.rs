//! Story video worker.
//!
//! Picks a topic, has a story written and narrated, assembles the video
//! and publishes it.

pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod runner;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use history::{append_history, format_history_line};
pub use logging::{RunLogger, RunPhase};
pub use runner::{RunReport, StoryRunner};

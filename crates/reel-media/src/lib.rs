//! Narration video assembly on top of ffmpeg, ffprobe and whisper.cpp.
//!
//! This crate provides:
//! - An FFmpeg command builder and runner with timeouts and stderr capture
//! - Duration probing with per-handle caching
//! - Background trimming, caption segmentation and SRT export
//! - A layered render graph compiled to `-filter_complex`
//! - Muxing with atomic placement of the final file
//! - Per-run artifact tracking with guaranteed cleanup
//! - The [`VideoAssembler`] driving all of the above

pub mod artifacts;
pub mod captions;
pub mod command;
pub mod compositor;
pub mod error;
pub mod fs_utils;
pub mod media;
pub mod metrics;
pub mod mux;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod render_graph;
pub mod text;
pub mod tool;
pub mod transcribe;
pub mod trim;

pub use artifacts::{cleanup, ArtifactTracker};
pub use captions::{parse_srt, segment, to_srt, write_srt, DEFAULT_WORDS_PER_CUE};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compositor::{composite, CompositeStyle, TitleCard};
pub use error::{MediaError, MediaResult, Stage};
pub use fs_utils::move_file;
pub use media::MediaHandle;
pub use pipeline::{AssemblyConfig, AssemblyOutcome, AssemblyRequest, VideoAssembler};
pub use probe::{get_duration, probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use render_graph::{LayerId, RenderGraph, RenderLayer};
pub use text::{wrap_words, FontSource, Position, TextAlign, TextStyle};
pub use tool::{FfmpegTool, MediaTool, RenderJob};
pub use transcribe::{Transcriber, WhisperConfig, WhisperCppTranscriber};
pub use trim::{trim, StartPolicy, TrimmedClip};

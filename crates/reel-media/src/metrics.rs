//! Pipeline metrics.
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! embedding binary installs a recorder.

use metrics::{counter, histogram};

use crate::error::Stage;

/// Metric names as constants for consistency.
pub mod names {
    pub const STAGE_DURATION_SECONDS: &str = "storyreel_stage_duration_seconds";
    pub const STAGE_FAILURES_TOTAL: &str = "storyreel_stage_failures_total";
    pub const ASSEMBLIES_TOTAL: &str = "storyreel_assemblies_total";
    pub const ASSEMBLY_DURATION_SECONDS: &str = "storyreel_assembly_duration_seconds";
    pub const CAPTION_CUES: &str = "storyreel_caption_cues";
    pub const ARTIFACTS_REMOVED_TOTAL: &str = "storyreel_artifacts_removed_total";
}

/// Record how long a stage ran and whether it failed.
pub fn record_stage(stage: Stage, duration_secs: f64, ok: bool) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
    if !ok {
        counter!(names::STAGE_FAILURES_TOTAL, &labels).increment(1);
    }
}

/// Record a finished assembly.
pub fn record_assembly(duration_secs: f64, ok: bool) {
    let labels = [("outcome", if ok { "success" } else { "failure" }.to_string())];
    counter!(names::ASSEMBLIES_TOTAL, &labels).increment(1);
    histogram!(names::ASSEMBLY_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the number of cues rendered.
pub fn record_caption_cues(count: usize) {
    histogram!(names::CAPTION_CUES).record(count as f64);
}

/// Record removed intermediate files.
pub fn record_artifacts_removed(count: usize) {
    counter!(names::ARTIFACTS_REMOVED_TOTAL).increment(count as u64);
}

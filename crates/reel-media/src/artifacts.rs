//! Intermediate artifact lifecycle.
//!
//! Every intermediate file of a run lives in a per-run directory owned by an
//! [`ArtifactTracker`]. The tracker removes them when the run finishes and,
//! through `Drop`, on every early return or panic as well.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use reel_models::RunId;

use crate::error::MediaResult;

/// Delete every existing path in `artifacts` except `keep`.
///
/// Best effort: failures are logged, not returned. Returns the number of
/// files removed.
pub fn cleanup(artifacts: &[PathBuf], keep: Option<&Path>) -> usize {
    let mut removed = 0;
    for path in artifacts {
        if keep.is_some_and(|k| k == path.as_path()) {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed artifact");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "Failed to remove artifact: {}", e),
        }
    }
    removed
}

/// Owner of a run's working directory and the artifacts created in it.
#[derive(Debug)]
pub struct ArtifactTracker {
    run_id: RunId,
    dir: PathBuf,
    artifacts: Vec<PathBuf>,
    keep_on_failure: bool,
    finished: bool,
}

impl ArtifactTracker {
    /// Create `<work_root>/run-<id>`. Fails if the directory already exists.
    pub async fn create(work_root: &Path, run_id: RunId) -> MediaResult<Self> {
        tokio::fs::create_dir_all(work_root).await?;
        let dir = work_root.join(run_id.dir_name());
        tokio::fs::create_dir(&dir).await?;

        debug!(dir = %dir.display(), "Created run directory");

        Ok(Self {
            run_id,
            dir,
            artifacts: Vec::new(),
            keep_on_failure: false,
            finished: false,
        })
    }

    /// Keep the run directory when the tracker is dropped without finishing.
    pub fn keep_on_failure(mut self, keep: bool) -> Self {
        self.keep_on_failure = keep;
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Reserve a file name inside the run directory and track it.
    pub fn path(&mut self, name: &str) -> PathBuf {
        let path = self.dir.join(name);
        self.register(path.clone());
        path
    }

    /// Track a file created elsewhere.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.artifacts.contains(&path) {
            self.artifacts.push(path);
        }
    }

    /// Remove every artifact except `keep`, then the run directory.
    pub fn finish(mut self, keep: Option<&Path>) -> usize {
        self.finished = true;
        let removed = self.remove_all(keep);
        info!(run_id = %self.run_id, removed = removed, "Cleaned up run artifacts");
        removed
    }

    fn remove_all(&self, keep: Option<&Path>) -> usize {
        let removed = cleanup(&self.artifacts, keep);

        let result = if keep.is_some_and(|k| k.starts_with(&self.dir)) {
            std::fs::remove_dir(&self.dir)
        } else {
            std::fs::remove_dir_all(&self.dir)
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), "Failed to remove run directory: {}", e),
        }

        removed
    }
}

impl Drop for ArtifactTracker {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.keep_on_failure {
            warn!(
                run_id = %self.run_id,
                dir = %self.dir.display(),
                "Run did not complete, keeping artifacts for inspection"
            );
            return;
        }
        let removed = self.remove_all(None);
        info!(run_id = %self.run_id, removed = removed, "Run did not complete, removed artifacts");
    }
}

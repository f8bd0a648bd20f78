//! Media file handles with cached duration.

use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

use crate::error::{MediaError, MediaResult, Stage};
use crate::tool::MediaTool;

/// A media file plus its duration, probed at most once per handle.
#[derive(Debug)]
pub struct MediaHandle {
    path: PathBuf,
    duration: OnceCell<f64>,
}

impl MediaHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: OnceCell::new(),
        }
    }

    /// Handle whose duration is already known.
    pub fn with_duration(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration: OnceCell::new_with(Some(duration.max(0.0))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Duration if it has been probed already.
    pub fn cached_duration(&self) -> Option<f64> {
        self.duration.get().copied()
    }

    /// Duration in seconds, probing the file on first use.
    pub async fn duration<T>(&self, tool: &T) -> MediaResult<f64>
    where
        T: MediaTool + ?Sized,
    {
        self.duration
            .get_or_try_init(|| async {
                if !self.exists() {
                    return Err(MediaError::probe(format!(
                        "file does not exist: {}",
                        self.path.display()
                    )));
                }
                let secs = tool
                    .duration(&self.path)
                    .await
                    .map_err(|e| e.in_stage(Stage::Probe))?;
                if !secs.is_finite() || secs < 0.0 {
                    return Err(MediaError::probe(format!(
                        "invalid duration {} for {}",
                        secs,
                        self.path.display()
                    )));
                }
                Ok(secs)
            })
            .await
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MediaInfo;
    use crate::tool::RenderJob;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaTool for CountingProbe {
        async fn probe(&self, _path: &Path) -> MediaResult<MediaInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MediaInfo {
                duration: 12.5,
                has_video: true,
                has_audio: false,
                width: 0,
                height: 0,
            })
        }

        async fn extract(&self, _: &Path, _: &Path, _: f64, _: f64) -> MediaResult<()> {
            unimplemented!()
        }

        async fn render(&self, _: &RenderJob) -> MediaResult<()> {
            unimplemented!()
        }

        async fn mux(&self, _: &Path, _: &Path, _: &Path) -> MediaResult<()> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_duration_is_probed_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, b"x").await.unwrap();

        let tool = CountingProbe {
            calls: AtomicUsize::new(0),
        };
        let handle = MediaHandle::new(&path);
        assert_eq!(handle.cached_duration(), None);
        assert_eq!(handle.duration(&tool).await.unwrap(), 12.5);
        assert_eq!(handle.duration(&tool).await.unwrap(), 12.5);
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_probe_error() {
        let tool = CountingProbe {
            calls: AtomicUsize::new(0),
        };
        let handle = MediaHandle::new("/nonexistent/clip.mp4");
        let err = handle.duration(&tool).await.unwrap_err();
        assert!(matches!(err, MediaError::Probe { .. }));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }
}

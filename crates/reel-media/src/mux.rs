//! Narration muxing and final placement.

use std::path::Path;
use tracing::info;

use crate::error::{MediaError, MediaResult, Stage};
use crate::fs_utils::move_file;
use crate::media::MediaHandle;
use crate::tool::MediaTool;

/// Combine `video` with `narration` and place the result at `output`.
///
/// The muxed file is first written to `staging` (an artifact of the run)
/// and then moved onto `output`, so `output` is only touched once the mux
/// has fully succeeded. `video` is never modified.
pub async fn mux<T>(
    tool: &T,
    video: &MediaHandle,
    narration: &Path,
    staging: &Path,
    output: &Path,
) -> MediaResult<MediaHandle>
where
    T: MediaTool + ?Sized,
{
    for input in [video.path(), narration] {
        if !input.is_file() {
            return Err(MediaError::mux(format!(
                "input does not exist: {}",
                input.display()
            )));
        }
    }

    info!(
        video = %video.path().display(),
        narration = %narration.display(),
        "Muxing narration"
    );

    tool.mux(video.path(), narration, staging)
        .await
        .map_err(|e| e.in_stage(Stage::Mux))?;

    if !staging.is_file() {
        return Err(MediaError::mux(format!(
            "muxer produced no file at {}",
            staging.display()
        )));
    }

    move_file(staging, output)
        .await
        .map_err(|e| e.in_stage(Stage::Mux))?;

    Ok(MediaHandle::new(output))
}

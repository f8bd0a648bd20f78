//! Background clip selection and lossless extraction.

use rand::Rng;
use std::path::Path;
use tracing::info;

use crate::error::{MediaError, MediaResult, Stage};
use crate::media::MediaHandle;
use crate::tool::MediaTool;

/// Where the trimmed window starts within the background.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StartPolicy {
    /// Uniformly random start within `[0, duration - target]`.
    Random,
    /// Fixed start in seconds.
    At(f64),
    /// The beginning of the background.
    #[default]
    Beginning,
}

/// Resolve the start offset of a `target`-second window in `available` seconds.
pub fn choose_start(available: f64, target: f64, policy: StartPolicy) -> MediaResult<f64> {
    if !target.is_finite() || target <= 0.0 {
        return Err(MediaError::InvalidInput(format!(
            "target duration must be positive, got {}",
            target
        )));
    }

    let insufficient = |start: f64| MediaError::InsufficientLength {
        available,
        required: target,
        start,
    };

    if available < target {
        return Err(insufficient(0.0));
    }

    match policy {
        StartPolicy::Random => {
            let max_start = available - target;
            if max_start <= 0.0 {
                Ok(0.0)
            } else {
                Ok(rand::rng().random_range(0.0..=max_start))
            }
        }
        StartPolicy::Beginning => Ok(0.0),
        StartPolicy::At(start) => {
            if !start.is_finite() || start < 0.0 || start + target > available {
                return Err(insufficient(start));
            }
            Ok(start)
        }
    }
}

/// A trimmed clip and where it was cut from.
#[derive(Debug)]
pub struct TrimmedClip {
    pub clip: MediaHandle,
    /// Offset into the background in seconds
    pub start: f64,
}

/// Extract a `target`-second window of `background` into `output`.
///
/// The output is a stream copy and is overwritten if it already exists.
pub async fn trim<T>(
    tool: &T,
    background: &MediaHandle,
    target: f64,
    policy: StartPolicy,
    output: &Path,
) -> MediaResult<TrimmedClip>
where
    T: MediaTool + ?Sized,
{
    let available = background.duration(tool).await?;
    let start = choose_start(available, target, policy)?;

    info!(
        background = %background.path().display(),
        start = start,
        duration = target,
        "Trimming background clip"
    );

    tool.extract(background.path(), output, start, target)
        .await
        .map_err(|e| e.in_stage(Stage::Trim))?;

    if !output.is_file() {
        return Err(MediaError::stage(
            Stage::Trim,
            format!("extraction produced no file at {}", output.display()),
            None,
        ));
    }

    Ok(TrimmedClip {
        clip: MediaHandle::new(output),
        start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_start() {
        assert_eq!(choose_start(120.0, 45.0, StartPolicy::At(10.0)).unwrap(), 10.0);
        assert_eq!(choose_start(120.0, 45.0, StartPolicy::At(75.0)).unwrap(), 75.0);
        assert_eq!(choose_start(120.0, 45.0, StartPolicy::Beginning).unwrap(), 0.0);
    }

    #[test]
    fn test_fixed_start_past_end_is_insufficient() {
        let err = choose_start(120.0, 45.0, StartPolicy::At(80.0)).unwrap_err();
        assert!(matches!(
            err,
            MediaError::InsufficientLength { start, .. } if start == 80.0
        ));
    }

    #[test]
    fn test_invalid_start_is_rejected() {
        for start in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                choose_start(120.0, 45.0, StartPolicy::At(start)),
                Err(MediaError::InsufficientLength { .. })
            ));
        }
    }

    #[test]
    fn test_target_longer_than_background() {
        for policy in [StartPolicy::Random, StartPolicy::Beginning, StartPolicy::At(0.0)] {
            assert!(matches!(
                choose_start(30.0, 45.0, policy),
                Err(MediaError::InsufficientLength { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_target() {
        assert!(matches!(
            choose_start(30.0, 0.0, StartPolicy::Beginning),
            Err(MediaError::InvalidInput(_))
        ));
        assert!(choose_start(30.0, f64::NAN, StartPolicy::Beginning).is_err());
    }

    #[test]
    fn test_random_start_stays_in_range() {
        for _ in 0..200 {
            let start = choose_start(120.0, 45.0, StartPolicy::Random).unwrap();
            assert!((0.0..=75.0).contains(&start));
        }
        assert_eq!(choose_start(45.0, 45.0, StartPolicy::Random).unwrap(), 0.0);
    }
}

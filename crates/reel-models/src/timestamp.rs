//! SRT timestamp formatting and parsing.
//!
//! Subtitle timestamps use the `HH:MM:SS,mmm` layout. Formatting truncates
//! to whole milliseconds (never rounds), so a formatted value parsed back
//! yields the original seconds floored to the millisecond.

/// Tolerance (in milliseconds) absorbing binary float error before truncation,
/// e.g. `1.234 * 1000.0 == 1233.9999999999998`.
const MILLIS_EPSILON: f64 = 1e-6;

/// Convert seconds to whole milliseconds, truncating.
///
/// Negative and non-finite inputs clamp to zero.
pub fn truncate_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0 + MILLIS_EPSILON).floor() as u64
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// # Examples
/// ```
/// use reel_models::timestamp::format_srt_timestamp;
/// assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
/// assert_eq!(format_srt_timestamp(3661.5), "01:01:01,500");
/// assert_eq!(format_srt_timestamp(1.2349), "00:00:01,234");
/// ```
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = truncate_millis(seconds);
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`, `.` also accepted) to seconds.
///
/// # Examples
/// ```
/// use reel_models::timestamp::parse_srt_timestamp;
/// assert_eq!(parse_srt_timestamp("00:01:30,250").unwrap(), 90.25);
/// ```
pub fn parse_srt_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let (clock, millis) = ts
        .split_once([',', '.'])
        .ok_or_else(|| TimestampError::InvalidFormat(ts.to_string()))?;

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    let hours: u64 = parse_component("hours", parts[0])?;
    let minutes: u64 = parse_component("minutes", parts[1])?;
    let seconds: u64 = parse_component("seconds", parts[2])?;
    let millis: u64 = parse_component("milliseconds", millis)?;

    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return Err(TimestampError::OutOfRange(ts.to_string()));
    }

    let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis;
    Ok(total_ms as f64 / 1000.0)
}

fn parse_component(name: &'static str, value: &str) -> Result<u64, TimestampError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(TimestampError::InvalidValue(name, value.to_string()));
    }
    value
        .parse()
        .map_err(|_| TimestampError::InvalidValue(name, value.to_string()))
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    /// Timestamp string is empty
    Empty,
    /// Invalid numeric value for a component
    InvalidValue(&'static str, String),
    /// Invalid timestamp layout
    InvalidFormat(String),
    /// Minutes, seconds or milliseconds out of range
    OutOfRange(String),
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Timestamp cannot be empty"),
            Self::InvalidValue(component, value) => {
                write!(f, "Invalid {} value: '{}'", component, value)
            }
            Self::InvalidFormat(ts) => write!(
                f,
                "Invalid timestamp format: '{}'. Expected HH:MM:SS,mmm",
                ts
            ),
            Self::OutOfRange(ts) => write!(f, "Timestamp component out of range: '{}'", ts),
        }
    }
}

impl std::error::Error for TimestampError {}

//! Run history file.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;

/// One history line, without the trailing newline.
pub fn format_history_line(finished_at: DateTime<Local>, elapsed: Duration) -> String {
    format!(
        "Last Executed to Completion: {}, Execution Time: {:.2} seconds",
        finished_at.format("%Y-%m-%d %H:%M:%S"),
        elapsed.as_secs_f64()
    )
}

/// Append a completed run to the history file, creating it if needed.
pub async fn append_history(path: &Path, finished_at: DateTime<Local>, elapsed: Duration) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let line = format!("{}\n", format_history_line(finished_at, elapsed));
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

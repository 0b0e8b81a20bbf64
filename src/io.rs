//! Batch input and output: the whole command file is read up front and all
//! results are written in a single call once processing finishes.

use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::engine::RunStats;
use crate::error::{Result, SeverityQlError};

/// Read the command file and split it into lines.
///
/// Surrounding whitespace of the whole file is trimmed first, so a trailing
/// newline does not become an extra (empty) line.
pub async fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| SeverityQlError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;

    let lines: Vec<String> = text.trim().split('\n').map(str::to_owned).collect();
    debug!(path = %path.display(), lines = lines.len(), "read command file");
    Ok(lines)
}

/// Write output lines joined by `\n`, with no trailing newline.
pub async fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    let body = lines
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<&str>>()
        .join("\n");

    write(path, body).await?;
    debug!(path = %path.display(), lines = lines.len(), "wrote results");
    Ok(())
}

pub async fn write_stats(path: &Path, stats: &RunStats) -> Result<()> {
    let body = serde_json::to_string_pretty(stats)?;
    write(path, body).await
}

async fn write(path: &Path, body: String) -> Result<()> {
    fs::write(path, body)
        .await
        .map_err(|source| SeverityQlError::WriteOutput {
            path: path.to_path_buf(),
            source,
        })
}

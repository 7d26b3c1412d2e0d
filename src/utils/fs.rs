//! Directory creation and atomic file writes.
//!
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the target, so readers never observe a half-written artifact.

use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Create `path` and all missing parents.
///
/// # Errors
///
/// Fails if the directory cannot be created or `path` exists and is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Write `content` to `path` atomically, creating parent directories.
///
/// # Errors
///
/// Fails if the temporary file cannot be created, written, synced, or renamed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;
    Ok(())
}

/// Write several files atomically, concurrently on the blocking pool.
///
/// Every write is attempted; the error lists all files that failed.
///
/// # Errors
///
/// Fails if any individual write fails.
pub async fn atomic_write_multiple(files: Vec<(PathBuf, Vec<u8>)>) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }

    let tasks = files.into_iter().map(|(path, content)| {
        tokio::task::spawn_blocking(move || atomic_write(&path, &content))
    });
    let results = try_join_all(tasks).await.context("Failed to join atomic write tasks")?;

    let errors: Vec<String> =
        results.into_iter().filter_map(Result::err).map(|e| format!("  {e:#}")).collect();
    if !errors.is_empty() {
        return Err(anyhow::anyhow!("Failed to write {} files:\n{}", errors.len(), errors.join("\n")));
    }

    Ok(())
}

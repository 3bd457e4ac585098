use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use tracing::info;

/// True when `output` exists; the step that would produce it is skipped.
pub(crate) fn already_done(output: &Path) -> bool {
    if output.exists() {
        info!("{} already exists, skipping", output.display());
        true
    } else {
        false
    }
}

/// Empties `dir` of regular files, creating it if needed.
pub(crate) fn reset_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

/// Moves a processed source file into `archive_dir`.
pub(crate) fn archive(file: &Path, archive_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(archive_dir)?;
    let name = file
        .file_name()
        .ok_or(anyhow::anyhow!("Invalid path {}", file.display()))?;
    let target = archive_dir.join(name);
    if fs::rename(file, &target).is_err() {
        // rename fails across filesystems
        fs::copy(file, &target)
            .with_context(|| format!("Failed to archive {}", file.display()))?;
        fs::remove_file(file)?;
    }
    info!("Archived {} to {}", file.display(), archive_dir.display());
    Ok(target)
}

pub(crate) fn timestamped(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    dir.join(format!(
        "{}_{}.{}",
        stem,
        Local::now().format("%Y%m%d_%H%M%S"),
        extension
    ))
}

//! Text lists for ffmpeg's concat demuxer.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::schedule::Schedule;

fn quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// One `file`/`duration` pair per entry. The demuxer only honours a duration
/// when another file follows it, so without a hold entry the last file is
/// listed once more on its own.
pub(crate) fn render<T: AsRef<Path>>(schedule: &Schedule<T>) -> String {
    let mut text = String::new();
    for entry in schedule.entries() {
        let _ = writeln!(text, "file {}", quote(&absolute(entry.item.as_ref())));
        let _ = writeln!(text, "duration {}", entry.display_duration);
    }
    if let Some(last) = schedule.entries().last().filter(|entry| !entry.is_final) {
        let _ = writeln!(text, "file {}", quote(&absolute(last.item.as_ref())));
    }
    text
}

pub(crate) fn render_files<P: AsRef<Path>>(paths: &[P]) -> String {
    let mut text = String::new();
    for path in paths {
        let _ = writeln!(text, "file {}", quote(&absolute(path.as_ref())));
    }
    text
}

pub(crate) fn write(path: &Path, text: &str) -> anyhow::Result<()> {
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

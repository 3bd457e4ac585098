use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["png", "jpg", "jpeg", "webp"],
            MediaKind::Video => &["mp4", "mov", "mkv", "webm", "avi"],
            MediaKind::Audio => &["wav", "mp3", "m4a", "aac", "flac", "ogg"],
        }
    }

    pub(crate) fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// A file picked up from a media folder. Nothing inside the file is inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MediaItem {
    pub path: PathBuf,
}

impl MediaItem {
    pub(crate) fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl AsRef<Path> for MediaItem {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Lists files of `kind` in each directory, sorted by name per directory and
/// concatenated in the order the directories were given.
pub(crate) fn list_media<P: AsRef<Path>>(dirs: &[P], kind: MediaKind) -> anyhow::Result<Vec<MediaItem>> {
    let mut items = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        let mut paths = fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()?;
        paths.retain(|path| path.is_file() && kind.matches(path));
        paths.sort();

        debug!("Found {} {} files in {}", paths.len(), kind, dir.display());
        if paths.is_empty() {
            warn!("No {} files in {}", kind, dir.display());
        }

        items.extend(paths.into_iter().map(|path| MediaItem { path }));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn matches_extensions_case_insensitively() {
        assert!(MediaKind::Image.matches(Path::new("a/b/photo.JPG")));
        assert!(MediaKind::Image.matches(Path::new("x.webp")));
        assert!(!MediaKind::Image.matches(Path::new("x.mp4")));
        assert!(MediaKind::Audio.matches(Path::new("beat.wav")));
        assert!(!MediaKind::Audio.matches(Path::new("README")));
    }

    #[test]
    fn lists_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "clip.mp4");
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let items = list_media(&[dir.path()], MediaKind::Image).unwrap();
        let names: Vec<String> = items.iter().map(MediaItem::file_stem).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn keeps_directory_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(first.path(), "z.png");
        touch(second.path(), "a.png");

        let items = list_media(&[first.path(), second.path()], MediaKind::Image).unwrap();
        let names: Vec<String> = items.iter().map(MediaItem::file_stem).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn empty_directory_yields_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_media(&[dir.path()], MediaKind::Video).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_media(&[missing], MediaKind::Image).is_err());
    }
}

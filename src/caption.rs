//! Text overlays drawn by ffmpeg: quote captions on square images and title
//! cards on thumbnails.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::assemble::escape_filter_value;

/// Average glyph width as a share of the font size. Lines are wrapped with it
/// before ffmpeg measures the text.
const GLYPH_WIDTH: f64 = 0.5;
const THUMBNAIL_SIZE: (u32, u32) = (1280, 720);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct QuoteSet {
    pub name: String,
    pub quotes: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct TextStyle {
    pub font: PathBuf,
    pub font_size: u32,
}

/// Reads `[{"name": ..., "quotes": [...]}, ...]`. A missing file yields no quotes.
pub(crate) fn load_quotes(path: &Path) -> anyhow::Result<Vec<QuoteSet>> {
    if !path.exists() {
        warn!("{} not found, no quotes loaded", path.display());
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

pub(crate) fn quotes_for<'a>(db: &'a [QuoteSet], name: &str) -> &'a [String] {
    let wanted = name.replace('_', " ").to_lowercase();
    db.iter()
        .find(|set| set.name.to_lowercase() == wanted)
        .map(|set| set.quotes.as_slice())
        .unwrap_or(&[])
}

/// `mike_tyson` → `Mike Tyson`.
pub(crate) fn display_name(folder: &str) -> String {
    folder
        .split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Characters that fit in 80% of `width` at `font_size`.
pub(crate) fn chars_per_line(width: u32, font_size: u32) -> usize {
    let usable = f64::from(width) * 0.8;
    (usable / (f64::from(font_size.max(1)) * GLYPH_WIDTH)).floor().max(1.0) as usize
}

/// Greedy word wrap. A word longer than `max_chars` gets a line of its own.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Text goes through a file so quotes never need escaping inside the graph.
pub(crate) fn write_lines(path: &Path, lines: &[String]) -> anyhow::Result<()> {
    fs::write(path, lines.join("\n")).with_context(|| format!("Failed to write {}", path.display()))
}

fn drawtext(style: &TextStyle, text_file: &Path, x: &str, y: &str) -> String {
    format!(
        "drawtext=fontfile={}:textfile={}:expansion=none:fontsize={}:fontcolor=white:x={x}:y={y}",
        escape_filter_value(&style.font.to_string_lossy()),
        escape_filter_value(&text_file.to_string_lossy()),
        style.font_size
    )
}

/// Centre square crop scaled to `size`, with the caption centred on a
/// translucent box and outlined in black.
pub(crate) fn caption_filter(size: u32, style: &TextStyle, text_file: &Path) -> String {
    format!(
        "crop=min(iw\\,ih):min(iw\\,ih),scale={size}:{size},setsar=1,{}:line_spacing=15:\
         borderw=3:bordercolor=black:box=1:boxcolor=black@0.5:boxborderw=10",
        drawtext(style, text_file, "(w-text_w)/2", "(h-text_h)/2")
    )
}

/// 1280x720 frame with the title over the subtitle in a translucent box near
/// the bottom. The box is sized from the longer of the two lines.
pub(crate) fn thumbnail_filter(
    style: &TextStyle,
    title_file: &Path,
    title: &str,
    subtitle_file: &Path,
    subtitle: &str,
) -> String {
    let (width, height) = THUMBNAIL_SIZE;
    let widest = title.chars().count().max(subtitle.chars().count()) as f64;
    let box_width =
        ((widest * f64::from(style.font_size) * GLYPH_WIDTH) as u32 + 40).min(width);
    let box_height = 2 * style.font_size + 100;
    let box_x = (width - box_width) / 2;
    let box_y = height.saturating_sub(box_height + 160);
    let title_y = box_y + 10;
    let subtitle_y = title_y + style.font_size + 35;

    format!(
        "scale={width}:{height},setsar=1,\
         drawbox=x={box_x}:y={box_y}:w={box_width}:h={box_height}:color=black@0.5:t=fill,{},{}",
        drawtext(style, title_file, "(w-text_w)/2", &title_y.to_string()),
        drawtext(style, subtitle_file, "(w-text_w)/2", &subtitle_y.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(font_size: u32) -> TextStyle {
        TextStyle {
            font: PathBuf::from("/fonts/Roboto-Thin.ttf"),
            font_size,
        }
    }

    #[test]
    fn loads_quotes_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.json");
        assert!(load_quotes(&path).unwrap().is_empty());

        fs::write(
            &path,
            r#"[{"name": "Mike Tyson", "quotes": ["Everyone has a plan"]}]"#,
        )
        .unwrap();
        let db = load_quotes(&path).unwrap();
        assert_eq!(quotes_for(&db, "mike_tyson"), ["Everyone has a plan"]);
        assert_eq!(quotes_for(&db, "MIKE TYSON").len(), 1);
        assert!(quotes_for(&db, "Ali").is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(load_quotes(&path).is_err());
    }

    #[test]
    fn folder_names_become_titles() {
        assert_eq!(display_name("mike_tyson"), "Mike Tyson");
        assert_eq!(display_name("MUHAMMAD_ali"), "Muhammad Ali");
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let max = chars_per_line(1080, 85);
        assert_eq!(max, 20);
        assert_eq!(
            wrap_text("Everyone has a plan until they get punched in the mouth", max),
            vec!["Everyone has a plan", "until they get", "punched in the mouth"]
        );
        assert_eq!(wrap_text("Unbreakable", 4), vec!["Unbreakable"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn caption_filter_centres_boxed_text() {
        assert_eq!(
            caption_filter(1080, &style(85), Path::new("/tmp/w/a.txt")),
            "crop=min(iw\\,ih):min(iw\\,ih),scale=1080:1080,setsar=1,\
             drawtext=fontfile=/fonts/Roboto-Thin.ttf:textfile=/tmp/w/a.txt:expansion=none:\
             fontsize=85:fontcolor=white:x=(w-text_w)/2:y=(h-text_h)/2:line_spacing=15:\
             borderw=3:bordercolor=black:box=1:boxcolor=black@0.5:boxborderw=10"
        );
    }

    #[test]
    fn caption_paths_are_escaped() {
        let filter = caption_filter(1080, &style(85), Path::new("C:/captions/a.txt"));
        assert!(filter.contains(r"textfile=C\\:/captions/a.txt"));
    }

    #[test]
    fn thumbnail_box_fits_the_longer_line() {
        let filter = thumbnail_filter(
            &style(100),
            Path::new("/t/title.txt"),
            "Horus Heresy",
            Path::new("/t/subtitle.txt"),
            "Part One",
        );
        assert_eq!(
            filter,
            "scale=1280:720,setsar=1,\
             drawbox=x=320:y=260:w=640:h=300:color=black@0.5:t=fill,\
             drawtext=fontfile=/fonts/Roboto-Thin.ttf:textfile=/t/title.txt:expansion=none:\
             fontsize=100:fontcolor=white:x=(w-text_w)/2:y=270,\
             drawtext=fontfile=/fonts/Roboto-Thin.ttf:textfile=/t/subtitle.txt:expansion=none:\
             fontsize=100:fontcolor=white:x=(w-text_w)/2:y=405"
        );
    }

    #[test]
    fn long_titles_are_capped_at_frame_width() {
        let title = "x".repeat(200);
        let filter = thumbnail_filter(
            &style(100),
            Path::new("t.txt"),
            &title,
            Path::new("s.txt"),
            "",
        );
        assert!(filter.contains("drawbox=x=0:y=260:w=1280:"));
    }
}

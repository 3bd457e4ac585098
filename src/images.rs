use std::path::{Path, PathBuf};

use anyhow::Context;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::info;

use crate::pool::{self, MediaKind};

fn is_webp(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("webp"))
}

/// Writes a `.jpg` next to every `.webp` in `dir` and returns the new files.
pub(crate) fn convert_webp(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut converted = Vec::new();
    for item in pool::list_media(&[dir], MediaKind::Image)? {
        if !is_webp(&item.path) {
            continue;
        }
        let jpg_path = item.path.with_extension("jpg");
        let image = image::open(&item.path)
            .with_context(|| format!("Failed to open {}", item.path.display()))?;
        DynamicImage::ImageRgb8(image.to_rgb8()).save(&jpg_path)?;
        info!("Converted {} to {}", item.path.display(), jpg_path.display());
        converted.push(jpg_path);
    }
    Ok(converted)
}

fn center_square(image: &DynamicImage, size: u32) -> DynamicImage {
    let side = image.width().min(image.height());
    let left = (image.width() - side) / 2;
    let top = (image.height() - side) / 2;
    image
        .crop_imm(left, top, side, side)
        .resize_exact(size, size, FilterType::Lanczos3)
}

/// Replaces the image at `path` with its centre square scaled to `size`.
pub(crate) fn crop_center(path: &Path, size: u32) -> anyhow::Result<()> {
    let image =
        image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let cropped = center_square(&image, size);
    DynamicImage::ImageRgb8(cropped.to_rgb8())
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(())
}

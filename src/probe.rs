use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use ffmpeg_next::{self as ffmpeg, format, media, rescale, Rescale};

static INIT: OnceLock<Result<(), ffmpeg::Error>> = OnceLock::new();

pub(crate) fn init() -> anyhow::Result<()> {
    (*INIT.get_or_init(ffmpeg::init)).map_err(anyhow::Error::from)
}

/// Length of a media file in seconds.
pub(crate) fn duration_secs(path: &Path) -> anyhow::Result<f64> {
    init()?;
    let input = format::input(&path).with_context(|| format!("Failed to open {}", path.display()))?;

    let container_ms = input.duration().rescale(rescale::TIME_BASE, (1, 1000));
    let millis = if container_ms > 0 {
        container_ms
    } else {
        input
            .streams()
            .best(media::Type::Audio)
            .or_else(|| input.streams().best(media::Type::Video))
            .map(|stream| stream.duration().rescale(stream.time_base(), (1, 1000)))
            .unwrap_or(0)
    };

    if millis <= 0 {
        return Err(anyhow::anyhow!("Could not determine duration of {}", path.display()));
    }
    Ok(millis as f64 / 1000.0)
}

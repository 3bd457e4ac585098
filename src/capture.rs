use std::fs;
use std::path::Path;

use anyhow::Context;
use base64::Engine;
use ffmpeg::util::frame::video::Video;
use ffmpeg_next::{self as ffmpeg, codec, decoder, format, media, rescale, software, Error, Rescale};
use image::codecs::jpeg;
use image::{imageops, ImageBuffer, Rgb, RgbImage};
use tracing::debug;

use crate::probe;

/// Frames larger than this are cropped to their top-left corner.
const MAX_WIDTH: u32 = 1280;
const MAX_HEIGHT: u32 = 720;

#[derive(Debug, Clone, Copy)]
pub(crate) struct CaptureWindow {
    pub start_ms: i64,
    pub length_ms: i64,
    pub interval_ms: i64,
}

/// Copies an RGB24 frame into an image, skipping the padding at the end of each row.
fn to_image(frame: &Video) -> anyhow::Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let stride = frame.stride(0);
    let row_len = width as usize * 3;
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, pixels)
        .ok_or(anyhow::anyhow!("Failed to create image buffer"))
}

fn crop_to_limit(image: &RgbImage) -> RgbImage {
    let width = image.width().min(MAX_WIDTH);
    let height = image.height().min(MAX_HEIGHT);
    imageops::crop_imm(image, 0, 0, width, height).to_image()
}

fn encode_jpeg(image: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut jpeg_data = Vec::new();
    let mut encoder = jpeg::JpegEncoder::new_with_quality(&mut jpeg_data, 90);
    encoder.encode(
        image,
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg_data)
}

/// Samples one frame every `interval_ms` inside the window and returns them as
/// JPEG data URLs. Frames are also written to `save_dir` when given.
pub(crate) fn capture_frames(
    input_path: &Path,
    window: CaptureWindow,
    save_dir: Option<&Path>,
) -> anyhow::Result<Vec<String>> {
    use base64::prelude::BASE64_STANDARD;

    probe::init()?;
    let mut input = format::input(&input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;

    let start_pos = window.start_ms.rescale((1, 1000), rescale::TIME_BASE);
    input.seek(start_pos, ..start_pos)?;

    let video_stream_index = input
        .streams()
        .best(media::Type::Video)
        .ok_or(anyhow::anyhow!(Error::StreamNotFound))?
        .index();
    let video_stream = input
        .stream(video_stream_index)
        .ok_or(anyhow::anyhow!(Error::StreamNotFound))?;
    let time_base = video_stream.time_base();
    let mut decoder = codec::context::Context::from_parameters(video_stream.parameters())?
        .decoder()
        .video()?;

    let mut scaler = software::scaling::context::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        software::scaling::Flags::BILINEAR,
    )?;

    let start_pts = window.start_ms.rescale((1, 1000), time_base);
    let end_pts = (window.start_ms + window.length_ms).rescale((1, 1000), time_base);
    let interval = window.interval_ms.max(1).rescale((1, 1000), time_base).max(1);
    let mut next_pts = start_pts;

    if let Some(dir) = save_dir {
        fs::create_dir_all(dir)?;
    }
    let mut frames = Vec::new();
    let mut finished = false;
    let mut receive_and_process_decoded_frames =
        |decoder: &mut decoder::Video, finished: &mut bool| -> anyhow::Result<()> {
            let mut decoded = Video::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded
                    .timestamp()
                    .ok_or(anyhow::anyhow!("No timestamp"))?;
                if pts < next_pts {
                    continue;
                }
                if pts > end_pts {
                    *finished = true;
                    break;
                }
                next_pts += interval;

                let mut rgb = Video::empty();
                scaler.run(&decoded, &mut rgb)?;
                let image = crop_to_limit(&to_image(&rgb)?);
                let jpeg_data = encode_jpeg(&image)?;

                if let Some(dir) = save_dir {
                    let frame_path = dir.join(format!("frame_{:04}.jpg", frames.len()));
                    fs::write(&frame_path, &jpeg_data)?;
                }
                frames.push("data:image/jpeg;base64,".to_owned() + &BASE64_STANDARD.encode(jpeg_data));
            }
            Ok(())
        };

    for (stream, packet) in input.packets() {
        if finished {
            break;
        }
        if stream.index() == video_stream_index {
            decoder.send_packet(&packet)?;
            receive_and_process_decoded_frames(&mut decoder, &mut finished)?;
        }
    }
    decoder.send_eof()?;
    receive_and_process_decoded_frames(&mut decoder, &mut finished)?;

    debug!("Captured {} frames from {}", frames.len(), input_path.display());
    Ok(frames)
}

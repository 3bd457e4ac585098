//! Argument lists for the ffmpeg invocations that turn schedules, clips and
//! mixed narration into finished videos.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::ffmpeg::Ffmpeg;
use crate::playlist;
use crate::pool::MediaItem;
use crate::schedule::Schedule;

/// Zoom added per output frame by the Ken Burns style, capped at 1.5x.
const ZOOM_STEP: f64 = 0.00075;
const FADE_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Style {
    /// Each image is shown as is
    Still,
    /// Slow zoom with a fade in and out on every image
    KenBurns,
}

#[derive(Debug, Clone)]
pub(crate) struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub pixel_format: String,
    pub fps: u32,
    pub size: Option<(u32, u32)>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_owned(),
            audio_codec: "aac".to_owned(),
            pixel_format: "yuv420p".to_owned(),
            fps: 25,
            size: None,
        }
    }
}

fn args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    items.into_iter().map(Into::into).collect()
}

fn secs(value: f64) -> String {
    format!("{value:.3}")
}

/// Escapes a filter option value, then the whole token for the graph parser.
pub(crate) fn escape_filter_value(value: &str) -> String {
    let mut option = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option.push('\\');
        }
        option.push(c);
    }
    let mut graph = String::with_capacity(option.len());
    for c in option.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph.push('\\');
        }
        graph.push(c);
    }
    graph
}

fn video_codec_args(settings: &EncodeSettings) -> Vec<OsString> {
    args([
        "-c:v".to_owned(),
        settings.video_codec.clone(),
        "-pix_fmt".to_owned(),
        settings.pixel_format.clone(),
        "-r".to_owned(),
        settings.fps.to_string(),
    ])
}

fn still_filter(settings: &EncodeSettings) -> String {
    match settings.size {
        Some((width, height)) => format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,format={}",
            settings.pixel_format
        ),
        // odd dimensions are rejected by yuv420p encoders
        None => format!(
            "scale=trunc(iw/2)*2:trunc(ih/2)*2,setsar=1,format={}",
            settings.pixel_format
        ),
    }
}

/// Concat-demuxer slideshow, optionally muxed with narration and capped at `length`.
pub(crate) fn slideshow_args(
    playlist: &Path,
    audio: Option<&Path>,
    settings: &EncodeSettings,
    length: f64,
    output: &Path,
) -> Vec<OsString> {
    let mut list = args(["-f", "concat", "-safe", "0", "-i"]);
    list.push(playlist.into());
    if let Some(audio) = audio {
        list.push("-i".into());
        list.push(audio.into());
    }
    list.extend(args(["-vf".to_owned(), still_filter(settings)]));
    list.extend(video_codec_args(settings));
    if audio.is_some() {
        list.extend(args(["-map", "0:v:0", "-map", "1:a:0", "-af", "apad", "-c:a"]));
        list.push(settings.audio_codec.clone().into());
    }
    list.extend(args(["-t".to_owned(), secs(length)]));
    list.push(output.into());
    list
}

/// One image rendered for `length` seconds with a slow zoom and fades.
pub(crate) fn ken_burns_segment_args(
    image: &Path,
    length: f64,
    settings: &EncodeSettings,
    output: &Path,
) -> Vec<OsString> {
    let (width, height) = settings.size.unwrap_or((1280, 720));
    let frames = (length * f64::from(settings.fps)).ceil() as u64 + 100;
    let fade_out = (length - FADE_SECS).max(0.0);
    let filter = format!(
        "zoompan=z='min(zoom+{ZOOM_STEP},1.5)':d={frames}:s={width}x{height}:fps={fps},\
         format={pix},fade=t=in:st=0:d={FADE_SECS},fade=t=out:st={fade_out}:d={FADE_SECS}",
        fps = settings.fps,
        pix = settings.pixel_format,
    );

    let mut list = args(["-loop", "1", "-t"]);
    list.push(secs(length).into());
    list.push("-i".into());
    list.push(image.into());
    list.extend(args(["-vf".to_owned(), filter]));
    list.extend(video_codec_args(settings));
    list.extend(args(["-t".to_owned(), secs(length)]));
    list.push(output.into());
    list
}

/// Stream-copy concatenation of the files listed in `list`.
pub(crate) fn concat_copy_args(list: &Path, output: &Path) -> Vec<OsString> {
    let mut concat = args(["-f", "concat", "-safe", "0", "-i"]);
    concat.push(list.into());
    concat.extend(args(["-c", "copy"]));
    concat.push(output.into());
    concat
}

/// Silent re-encoded cut of `source`.
pub(crate) fn extract_clip_args(
    source: &Path,
    start: f64,
    length: f64,
    settings: &EncodeSettings,
    output: &Path,
) -> Vec<OsString> {
    let mut list = args(["-ss".to_owned(), secs(start), "-t".to_owned(), secs(length)]);
    list.push("-i".into());
    list.push(source.into());
    list.extend(video_codec_args(settings));
    list.push("-an".into());
    list.push(output.into());
    list
}

/// 9:16 centre crop of `source`, scaled to 1080x1920 and laid over `audio`.
pub(crate) fn vertical_clip_args(
    source: &Path,
    start: f64,
    length: f64,
    audio: &Path,
    settings: &EncodeSettings,
    output: &Path,
) -> Vec<OsString> {
    let mut list = args(["-ss".to_owned(), secs(start), "-t".to_owned(), secs(length)]);
    list.push("-i".into());
    list.push(source.into());
    list.push("-i".into());
    list.push(audio.into());
    list.extend(args([
        "-map",
        "0:v:0",
        "-map",
        "1:a:0",
        "-vf",
        "crop=ih*9/16:ih,scale=1080:1920,setsar=1",
    ]));
    list.extend(video_codec_args(settings));
    list.push("-c:a".into());
    list.push(settings.audio_codec.clone().into());
    list.push("-shortest".into());
    list.push(output.into());
    list
}

/// Re-encodes `video` with `audio` as its soundtrack, ending with the shorter one.
pub(crate) fn mux_args(
    video: &Path,
    audio: &Path,
    audio_gain_db: f64,
    settings: &EncodeSettings,
    output: &Path,
) -> Vec<OsString> {
    let mut list = args(["-i"]);
    list.push(video.into());
    list.push("-i".into());
    list.push(audio.into());
    list.extend(args(["-map", "0:v:0", "-map", "1:a:0"]));
    list.extend(video_codec_args(settings));
    list.extend(args(["-af".to_owned(), format!("volume={audio_gain_db:+}dB")]));
    list.push("-c:a".into());
    list.push(settings.audio_codec.clone().into());
    list.push("-shortest".into());
    list.push(output.into());
    list
}

/// Runs `filter` over a single image and writes one JPEG frame.
pub(crate) fn still_frame_args(image: &Path, filter: &str, output: &Path) -> Vec<OsString> {
    let mut list = args(["-i"]);
    list.push(image.into());
    list.extend(args(["-vf", filter, "-frames:v", "1", "-q:v", "2"]));
    list.push(output.into());
    list
}

/// Renders `schedule` into `output`, with `audio` as soundtrack when given.
/// Intermediate files go to `work_dir`.
pub(crate) async fn render_schedule(
    ffmpeg: &Ffmpeg,
    schedule: &Schedule<MediaItem>,
    audio: Option<&Path>,
    length: f64,
    style: Style,
    settings: &EncodeSettings,
    work_dir: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    fs::create_dir_all(work_dir)?;
    let list_path = work_dir.join("images_list.txt");

    match style {
        Style::Still => {
            playlist::write(&list_path, &playlist::render(schedule))?;
            ffmpeg
                .run(&slideshow_args(&list_path, audio, settings, length, output))
                .await?;
        }
        Style::KenBurns => {
            let mut segments: Vec<PathBuf> = Vec::with_capacity(schedule.len());
            for (i, entry) in schedule.entries().iter().enumerate() {
                if entry.is_final {
                    continue;
                }
                let segment = work_dir.join(format!("segment_{i:04}.mp4"));
                ffmpeg
                    .run(&ken_burns_segment_args(
                        &entry.item.path,
                        entry.display_duration,
                        settings,
                        &segment,
                    ))
                    .await?;
                info!("Rendered segment {}/{}", i + 1, schedule.len());
                segments.push(segment);
            }
            playlist::write(&list_path, &playlist::render_files(&segments))?;
            let mut list = args(["-f", "concat", "-safe", "0", "-i"]);
            list.push(list_path.as_path().into());
            if let Some(audio) = audio {
                list.push("-i".into());
                list.push(audio.into());
                list.extend(args(["-map", "0:v:0", "-map", "1:a:0", "-af", "apad", "-c:v", "copy", "-c:a"]));
                list.push(settings.audio_codec.clone().into());
            } else {
                list.extend(args(["-c", "copy"]));
            }
            list.extend(args(["-t".to_owned(), secs(length)]));
            list.push(output.into());
            ffmpeg.run(&list).await?;
        }
    }

    info!("Video saved to {}", output.display());
    Ok(())
}

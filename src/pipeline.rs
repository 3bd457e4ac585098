use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_openai::types::{SpeechModel, Voice};
use clap::{Args, ValueEnum};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use crate::ai::{self, NarrationBrief, SpeechSettings};
use crate::assemble::{self, EncodeSettings, Style};
use crate::audio::{self, MixSettings};
use crate::capture::{self, CaptureWindow};
use crate::caption::{self, TextStyle};
use crate::ffmpeg::Ffmpeg;
use crate::highlights;
use crate::images;
use crate::playlist;
use crate::pool::{self, MediaItem, MediaKind};
use crate::probe;
use crate::schedule::{self, ScheduleMode, ScheduleOptions};
use crate::workspace;

/// What every command shares: the encoder tool and the random source.
pub(crate) struct Session {
    pub ffmpeg: Ffmpeg,
    pub rng: StdRng,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ModeArg {
    /// Every image shows for --per-item seconds; the video may run a little long
    FixedPerItem,
    /// As many images as --per-item implies, sharing the length evenly
    ExactFill,
    /// Exactly --count images sharing the length evenly
    FixedCount,
    /// --per-item seconds each, the last image gets what is left
    TrimLast,
}

#[derive(Debug, Args)]
pub(crate) struct ScheduleArgs {
    /// Nominal seconds each image stays on screen
    #[arg(long, default_value_t = 30.0)]
    per_item: f64,
    #[arg(long, value_enum, default_value_t = ModeArg::FixedPerItem)]
    mode: ModeArg,
    /// Number of images for --mode fixed-count
    #[arg(long, required_if_eq("mode", "fixed-count"))]
    count: Option<NonZeroUsize>,
    /// Shuffle the images once before looping them
    #[arg(long)]
    shuffle: bool,
    /// Repeat the last image so it stays up after the audio ends
    #[arg(long)]
    hold: bool,
}

impl ScheduleArgs {
    fn options(&self) -> anyhow::Result<ScheduleOptions> {
        let mode = match self.mode {
            ModeArg::FixedPerItem => ScheduleMode::FixedPerItem,
            ModeArg::ExactFill => ScheduleMode::ExactFill,
            ModeArg::FixedCount => ScheduleMode::FixedCount(
                self.count
                    .ok_or(anyhow::anyhow!("--count is required with --mode fixed-count"))?,
            ),
            ModeArg::TrimLast => ScheduleMode::TrimLast,
        };
        Ok(ScheduleOptions {
            per_item_duration: self.per_item,
            mode,
            shuffle: self.shuffle,
            hold_last: self.hold,
        })
    }
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value}"))?;
    let width = width.parse().map_err(|_| format!("invalid width in {value}"))?;
    let height = height.parse().map_err(|_| format!("invalid height in {value}"))?;
    Ok((width, height))
}

#[derive(Debug, Args)]
pub(crate) struct EncodeArgs {
    #[arg(long, default_value = "libx264")]
    video_codec: String,
    #[arg(long, default_value = "aac")]
    audio_codec: String,
    #[arg(long, default_value = "yuv420p")]
    pix_fmt: String,
    #[arg(long, default_value_t = 25)]
    fps: u32,
    /// Output size as WIDTHxHEIGHT; images are letterboxed to fit
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,
}

impl EncodeArgs {
    fn settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            pixel_format: self.pix_fmt.clone(),
            fps: self.fps,
            size: self.size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum VoiceArg {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

#[derive(Debug, Args)]
pub(crate) struct VoiceArgs {
    #[arg(long, value_enum, default_value_t = VoiceArg::Onyx)]
    voice: VoiceArg,
    /// Use the high definition speech model
    #[arg(long)]
    hd: bool,
}

impl VoiceArgs {
    fn settings(&self) -> SpeechSettings {
        let voice = match self.voice {
            VoiceArg::Alloy => Voice::Alloy,
            VoiceArg::Echo => Voice::Echo,
            VoiceArg::Fable => Voice::Fable,
            VoiceArg::Onyx => Voice::Onyx,
            VoiceArg::Nova => Voice::Nova,
            VoiceArg::Shimmer => Voice::Shimmer,
        };
        let model = if self.hd {
            SpeechModel::Tts1Hd
        } else {
            SpeechModel::Tts1
        };
        SpeechSettings { voice, model }
    }
}

/// Seconds of video to fill: the narration plus a tail, or an explicit length.
fn target_length(audio: Option<&Path>, duration: Option<f64>, tail: f64) -> anyhow::Result<f64> {
    match (audio, duration) {
        (_, Some(duration)) => Ok(duration),
        (Some(audio), None) => Ok(probe::duration_secs(audio)? + tail.max(0.0)),
        (None, None) => Err(anyhow::anyhow!("Either --audio or --duration is required")),
    }
}

fn pick_track(tracks: &[MediaItem], session: &mut Session) -> anyhow::Result<PathBuf> {
    tracks
        .choose(&mut session.rng)
        .map(|item| item.path.clone())
        .ok_or(anyhow::anyhow!("No music tracks found"))
}

async fn mix_blocking(
    narration: PathBuf,
    music: Vec<PathBuf>,
    output: PathBuf,
    settings: MixSettings,
) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || audio::mix(&narration, &music, &output, &settings)).await?
}

/// Archives a processed source. A failure is logged so the batch can move on.
fn archive_source(video: &MediaItem, archive_dir: &Path) -> bool {
    match workspace::archive(&video.path, archive_dir) {
        Ok(_) => true,
        Err(e) => {
            error!("Failed to archive {}: {:#}", video.path.display(), e);
            false
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct ScheduleCommand {
    /// Image folders to draw from
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Narration whose length (plus --tail) sets the target
    #[arg(long)]
    audio: Option<PathBuf>,
    /// Target length in seconds
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long, default_value_t = 0.0)]
    tail: f64,
    #[command(flatten)]
    schedule: ScheduleArgs,
}

pub(crate) fn print_schedule(session: &mut Session, args: ScheduleCommand) -> anyhow::Result<()> {
    let items = pool::list_media(&args.images, MediaKind::Image)?;
    let length = target_length(args.audio.as_deref(), args.duration, args.tail)?;
    let schedule = schedule::build_schedule(&items, length, &args.schedule.options()?, &mut session.rng)?;
    info!(
        "{} entries covering {:.2}s of {:.2}s ({:.2}s with hold)",
        schedule.len(),
        schedule.covered_duration(),
        length,
        schedule.total_duration()
    );
    print!("{}", playlist::render(&schedule));
    Ok(())
}

#[derive(Debug, Args)]
pub(crate) struct SlideshowCommand {
    /// Image folders to draw from
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Narration laid under the slideshow
    #[arg(long)]
    audio: Option<PathBuf>,
    /// Target length in seconds, instead of following the narration
    #[arg(long)]
    duration: Option<f64>,
    /// Seconds the video keeps running after the narration ends
    #[arg(long, default_value_t = 10.0)]
    tail: f64,
    #[arg(long, value_enum, default_value_t = Style::Still)]
    style: Style,
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, default_value = "finished_material")]
    out_dir: PathBuf,
    #[arg(long, default_value = "temp/slideshow")]
    work_dir: PathBuf,
    #[command(flatten)]
    schedule: ScheduleArgs,
    #[command(flatten)]
    encode: EncodeArgs,
}

pub(crate) async fn slideshow(session: &mut Session, args: SlideshowCommand) -> anyhow::Result<PathBuf> {
    let output = match &args.output {
        Some(output) => output.clone(),
        None => workspace::timestamped(&args.out_dir, "final_video", "mp4"),
    };
    if workspace::already_done(&output) {
        return Ok(output);
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let items = pool::list_media(&args.images, MediaKind::Image)?;
    let length = target_length(args.audio.as_deref(), args.duration, args.tail)?;
    let schedule = schedule::build_schedule(&items, length, &args.schedule.options()?, &mut session.rng)?;
    info!(
        "Showing {} images over {:.1}s ({} in pool)",
        schedule.len(),
        length,
        items.len()
    );

    assemble::render_schedule(
        &session.ffmpeg,
        &schedule,
        args.audio.as_deref(),
        length,
        args.style,
        &args.encode.settings(),
        &args.work_dir,
        &output,
    )
    .await?;
    Ok(output)
}

#[derive(Debug, Args)]
pub(crate) struct NarrateCommand {
    /// Text file to read aloud
    script: PathBuf,
    #[arg(short, long, default_value = "tts_outputs/script_tts.mp3")]
    output: PathBuf,
    /// Folder for the per-chunk speech files
    #[arg(long, default_value = "tts_outputs")]
    work_dir: PathBuf,
    #[command(flatten)]
    voice: VoiceArgs,
}

pub(crate) async fn narrate(session: &mut Session, args: NarrateCommand) -> anyhow::Result<PathBuf> {
    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read {}", args.script.display()))?;
    ai::speak_script(
        &text,
        &args.voice.settings(),
        &args.work_dir,
        &args.output,
        &session.ffmpeg,
    )
    .await?;
    Ok(args.output)
}

#[derive(Debug, Args)]
pub(crate) struct MixCommand {
    narration: PathBuf,
    /// Folder of background tracks
    #[arg(long)]
    music: PathBuf,
    /// Play every track back to back instead of one random track
    #[arg(long)]
    all_music: bool,
    /// Length of the mix in seconds; defaults to the narration length
    #[arg(long)]
    length: Option<f64>,
    #[arg(long, default_value_t = 5.0, allow_hyphen_values = true)]
    narration_gain: f64,
    #[arg(long, default_value_t = -7.0, allow_hyphen_values = true)]
    music_gain: f64,
    /// Fade in and out over this many seconds
    #[arg(long)]
    fade: Option<f64>,
    #[arg(short, long, default_value = "final_combined_audio.m4a")]
    output: PathBuf,
}

pub(crate) async fn mix(session: &mut Session, args: MixCommand) -> anyhow::Result<PathBuf> {
    if workspace::already_done(&args.output) {
        return Ok(args.output);
    }
    let tracks = pool::list_media(&[&args.music], MediaKind::Audio)?;
    let music = if args.all_music {
        tracks.into_iter().map(|item| item.path).collect()
    } else {
        vec![pick_track(&tracks, session)?]
    };
    if music.is_empty() {
        return Err(anyhow::anyhow!("No music tracks in {}", args.music.display()));
    }

    let settings = MixSettings {
        length: args.length,
        narration_gain_db: args.narration_gain,
        music_gain_db: args.music_gain,
        fade: args.fade,
    };
    mix_blocking(args.narration, music, args.output.clone(), settings).await?;
    Ok(args.output)
}

#[derive(Debug, Args)]
pub(crate) struct LongformCommand {
    /// Text file to read aloud
    script: PathBuf,
    /// Image folders to draw from
    #[arg(long = "images", required = true)]
    images: Vec<PathBuf>,
    /// Folder of background tracks, all played back to back
    #[arg(long)]
    music: PathBuf,
    #[arg(long, default_value = "project_final_clips")]
    project_dir: PathBuf,
    #[arg(long, default_value = "tts_outputs")]
    tts_dir: PathBuf,
    /// Seconds the video keeps running after the narration ends
    #[arg(long, default_value_t = 10.0)]
    tail: f64,
    #[arg(long, value_enum, default_value_t = Style::Still)]
    style: Style,
    #[command(flatten)]
    voice: VoiceArgs,
    #[command(flatten)]
    schedule: ScheduleArgs,
    #[command(flatten)]
    encode: EncodeArgs,
}

pub(crate) async fn longform(session: &mut Session, args: LongformCommand) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(&args.project_dir)?;
    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read {}", args.script.display()))?;

    let narration = args.tts_dir.join("script_tts.mp3");
    ai::speak_script(
        &text,
        &args.voice.settings(),
        &args.tts_dir,
        &narration,
        &session.ffmpeg,
    )
    .await?;

    let mixed = args.project_dir.join("final_combined_audio.m4a");
    if !workspace::already_done(&mixed) {
        let music: Vec<PathBuf> = pool::list_media(&[&args.music], MediaKind::Audio)?
            .into_iter()
            .map(|item| item.path)
            .collect();
        if music.is_empty() {
            return Err(anyhow::anyhow!("No music tracks in {}", args.music.display()));
        }
        let settings = MixSettings {
            length: Some(probe::duration_secs(&narration)? + args.tail.max(0.0)),
            narration_gain_db: 6.0,
            music_gain_db: -18.0,
            fade: Some(2.0),
        };
        mix_blocking(narration.clone(), music, mixed.clone(), settings).await?;
    }

    let output = slideshow(
        session,
        SlideshowCommand {
            images: args.images,
            audio: Some(mixed),
            duration: None,
            tail: 0.0,
            style: args.style,
            output: None,
            out_dir: args.project_dir.clone(),
            work_dir: args.project_dir.join("work"),
            schedule: args.schedule,
            encode: args.encode,
        },
    )
    .await?;

    workspace::reset_dir(&args.tts_dir)?;
    Ok(output)
}

#[derive(Debug, Args)]
pub(crate) struct ShortsCommand {
    /// Folder of source videos
    source: PathBuf,
    /// Folder of beats, one picked at random per clip
    #[arg(long)]
    music: PathBuf,
    /// What the footage shows, passed to the narrator
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = ai::DEFAULT_PERSONA)]
    persona: String,
    /// Seconds of source per clip
    #[arg(long, default_value_t = 60)]
    window: u32,
    /// Seconds between sampled frames
    #[arg(long, default_value_t = 2.0)]
    interval: f64,
    #[arg(long, default_value = "finished_material/project_final_clips")]
    out_dir: PathBuf,
    #[arg(long, default_value = "finished_material/old_source_material")]
    archive_dir: PathBuf,
    #[arg(long, default_value = "temp")]
    work_dir: PathBuf,
    #[command(flatten)]
    voice: VoiceArgs,
    #[command(flatten)]
    encode: EncodeArgs,
}

async fn short_for_window(
    session: &mut Session,
    args: &ShortsCommand,
    video: &MediaItem,
    tracks: &[MediaItem],
    start: f64,
) -> anyhow::Result<PathBuf> {
    let frames_dir = args.work_dir.join("frames");
    let tts_dir = args.work_dir.join("tts_outputs");
    workspace::reset_dir(&frames_dir)?;
    workspace::reset_dir(&tts_dir)?;

    let window = CaptureWindow {
        start_ms: (start * 1000.0) as i64,
        length_ms: i64::from(args.window) * 1000,
        interval_ms: (args.interval * 1000.0) as i64,
    };
    let frames = {
        let path = video.path.clone();
        let dir = frames_dir.clone();
        tokio::task::spawn_blocking(move || capture::capture_frames(&path, window, Some(&dir))).await??
    };
    if frames.is_empty() {
        return Err(anyhow::anyhow!("No frames captured at {start}s"));
    }
    info!("Captured {} frames at {}s", frames.len(), start);

    let video_name = video.file_stem();
    let brief = NarrationBrief {
        persona: &args.persona,
        description: &args.description,
        video_name: &video_name,
        speech_secs: args.window.saturating_sub(10).max(1),
    };
    let narration_text = ai::narrate_frames(&brief, frames).await?;
    fs::write(tts_dir.join("summary.txt"), &narration_text)?;

    let narration = tts_dir.join("summary_tts.mp3");
    ai::audio_speech(&narration_text, &args.voice.settings(), &narration).await?;

    let mixed = tts_dir.join("combined_summary.m4a");
    let settings = MixSettings {
        length: Some(f64::from(args.window)),
        ..MixSettings::default()
    };
    mix_blocking(narration, vec![pick_track(tracks, session)?], mixed.clone(), settings).await?;

    let output = workspace::timestamped(&args.out_dir, &format!("{video_name}_{}", start as u64), "mp4");
    session
        .ffmpeg
        .run(&assemble::vertical_clip_args(
            &video.path,
            start,
            f64::from(args.window),
            &mixed,
            &args.encode.settings(),
            &output,
        ))
        .await?;
    info!("Clip saved to {}", output.display());
    Ok(output)
}

pub(crate) async fn shorts(session: &mut Session, args: ShortsCommand) -> anyhow::Result<()> {
    fs::create_dir_all(&args.out_dir)?;
    let tracks = pool::list_media(&[&args.music], MediaKind::Audio)?;
    if tracks.is_empty() {
        return Err(anyhow::anyhow!("No music tracks in {}", args.music.display()));
    }

    for video in pool::list_media(&[&args.source], MediaKind::Video)? {
        info!("Processing {}", video.path.display());
        let length = match probe::duration_secs(&video.path) {
            Ok(length) => length,
            Err(e) => {
                error!("Skipping {}: {:#}", video.path.display(), e);
                continue;
            }
        };

        for start in highlights::window_starts(length, f64::from(args.window)) {
            if let Err(e) = short_for_window(session, &args, &video, &tracks, start).await {
                warn!("Skipping {} at {}s: {:#}", video.path.display(), start, e);
            }
        }
        archive_source(&video, &args.archive_dir);
    }
    Ok(())
}

#[derive(Debug, Args)]
pub(crate) struct MontageCommand {
    /// Folder of source videos
    source: PathBuf,
    /// Folder of beats, one picked at random per video
    #[arg(long)]
    music: PathBuf,
    #[arg(long, default_value_t = 3)]
    clips: usize,
    #[arg(long, default_value_t = 8)]
    min_len: u32,
    #[arg(long, default_value_t = 14)]
    max_len: u32,
    #[arg(long, default_value_t = -3.0, allow_hyphen_values = true)]
    music_gain: f64,
    #[arg(long, default_value = "finished_material/project_final_clips")]
    out_dir: PathBuf,
    #[arg(long, default_value = "finished_material/old_source_material")]
    archive_dir: PathBuf,
    #[arg(long, default_value = "temp")]
    work_dir: PathBuf,
    #[command(flatten)]
    encode: EncodeArgs,
}

async fn montage_for(
    session: &mut Session,
    args: &MontageCommand,
    video: &MediaItem,
    tracks: &[MediaItem],
) -> anyhow::Result<PathBuf> {
    let settings = args.encode.settings();
    let length = probe::duration_secs(&video.path)?;
    let picks = highlights::pick_highlights(
        &mut session.rng,
        length,
        args.clips,
        args.min_len,
        args.max_len,
    )?;

    let temp_dir = args.work_dir.join(format!("temp_{}", video.file_stem()));
    fs::create_dir_all(&temp_dir)?;

    let mut clips = Vec::with_capacity(picks.len());
    for (i, pick) in picks.iter().enumerate() {
        let clip = temp_dir.join(format!("clip_{i}.mp4"));
        session
            .ffmpeg
            .run(&assemble::extract_clip_args(
                &video.path,
                f64::from(pick.start),
                f64::from(pick.length),
                &settings,
                &clip,
            ))
            .await?;
        clips.push(clip);
    }

    let list_path = temp_dir.join("filelist.txt");
    playlist::write(&list_path, &playlist::render_files(&clips))?;
    let joined = temp_dir.join("concatenated_clip.mp4");
    session
        .ffmpeg
        .run(&assemble::concat_copy_args(&list_path, &joined))
        .await?;

    let output = workspace::timestamped(&args.out_dir, &video.file_stem(), "mp4");
    let beat = pick_track(tracks, session)?;
    session
        .ffmpeg
        .run(&assemble::mux_args(&joined, &beat, args.music_gain, &settings, &output))
        .await?;

    fs::remove_dir_all(&temp_dir)?;
    info!("Montage saved to {}", output.display());
    Ok(output)
}

pub(crate) async fn montage(session: &mut Session, args: MontageCommand) -> anyhow::Result<()> {
    fs::create_dir_all(&args.out_dir)?;
    let tracks = pool::list_media(&[&args.music], MediaKind::Audio)?;
    if tracks.is_empty() {
        return Err(anyhow::anyhow!("No music tracks in {}", args.music.display()));
    }

    for video in pool::list_media(&[&args.source], MediaKind::Video)? {
        info!("Processing {}", video.path.display());
        match montage_for(session, &args, &video, &tracks).await {
            Ok(_) => {
                archive_source(&video, &args.archive_dir);
            }
            Err(e) => error!("Skipping {}: {:#}", video.path.display(), e),
        }
    }
    Ok(())
}

#[derive(Debug, Args)]
pub(crate) struct PrepareImagesCommand {
    dir: PathBuf,
    /// Side of the square images in pixels
    #[arg(long, default_value_t = 1080)]
    size: u32,
    /// Only convert webp files, leave every image uncropped
    #[arg(long)]
    no_crop: bool,
}

pub(crate) fn prepare_images(args: PrepareImagesCommand) -> anyhow::Result<()> {
    let converted = images::convert_webp(&args.dir)?;
    info!("Converted {} webp images", converted.len());
    if args.no_crop {
        return Ok(());
    }

    let mut cropped = 0;
    for item in pool::list_media(&[&args.dir], MediaKind::Image)? {
        if item.path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("webp")) {
            continue;
        }
        match images::crop_center(&item.path, args.size) {
            Ok(()) => cropped += 1,
            Err(e) => warn!("{:#}", e),
        }
    }
    info!("Cropped {} images to {}x{}", cropped, args.size, args.size);
    Ok(())
}

#[derive(Debug, Args)]
pub(crate) struct CaptionImagesCommand {
    /// Folder with one sub-folder of images per person
    images: PathBuf,
    /// JSON list of {"name", "quotes"} objects
    #[arg(long, default_value = "quotes.json")]
    quotes: PathBuf,
    #[arg(long, default_value = "fonts/Roboto-Thin.ttf")]
    font: PathBuf,
    #[arg(long, default_value_t = 85)]
    font_size: u32,
    /// Side of the square output images in pixels
    #[arg(long, default_value_t = 1080)]
    size: u32,
    #[arg(long, default_value = "finished_material/captioned_images")]
    out_dir: PathBuf,
    #[arg(long, default_value = "temp/captions")]
    work_dir: PathBuf,
}

pub(crate) async fn caption_images(
    session: &mut Session,
    args: CaptionImagesCommand,
) -> anyhow::Result<usize> {
    let quotes = caption::load_quotes(&args.quotes)?;
    let style = TextStyle {
        font: args.font.clone(),
        font_size: args.font_size,
    };
    fs::create_dir_all(&args.work_dir)?;

    let mut folders = fs::read_dir(&args.images)
        .with_context(|| format!("Failed to list {}", args.images.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    folders.retain(|path| path.is_dir());
    folders.sort();

    let mut captioned = 0;
    for folder in folders {
        let name = caption::display_name(
            &folder
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let choices = caption::quotes_for(&quotes, &name);
        if choices.is_empty() {
            info!("No quotes for {}, skipping", name);
            continue;
        }

        let target_dir = args.out_dir.join(&name);
        fs::create_dir_all(&target_dir)?;
        let max_chars = caption::chars_per_line(args.size, args.font_size);
        for image in pool::list_media(&[&folder], MediaKind::Image)? {
            let Some(quote) = choices.choose(&mut session.rng) else {
                continue;
            };
            let mut lines = caption::wrap_text(quote, max_chars);
            lines.push(format!("- {name}"));
            let text_file = args.work_dir.join(format!("{}.txt", image.file_stem()));
            caption::write_lines(&text_file, &lines)?;

            let output = target_dir.join(format!("{}.jpg", image.file_stem()));
            let filter = caption::caption_filter(args.size, &style, &text_file);
            match session
                .ffmpeg
                .run(&assemble::still_frame_args(&image.path, &filter, &output))
                .await
            {
                Ok(()) => captioned += 1,
                Err(e) => warn!("Skipping {}: {:#}", image.path.display(), e),
            }
        }
    }
    info!("Captioned {} images into {}", captioned, args.out_dir.display());
    Ok(captioned)
}

#[derive(Debug, Args)]
pub(crate) struct ThumbnailsCommand {
    images: PathBuf,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    subtitle: String,
    #[arg(long, default_value = "fonts/Roboto-Thin.ttf")]
    font: PathBuf,
    #[arg(long, default_value_t = 100)]
    font_size: u32,
    #[arg(long, default_value = "finished_material/thumbnails")]
    out_dir: PathBuf,
    #[arg(long, default_value = "temp/thumbnails")]
    work_dir: PathBuf,
}

pub(crate) async fn thumbnails(session: &mut Session, args: ThumbnailsCommand) -> anyhow::Result<usize> {
    fs::create_dir_all(&args.out_dir)?;
    fs::create_dir_all(&args.work_dir)?;
    let style = TextStyle {
        font: args.font.clone(),
        font_size: args.font_size,
    };
    let title_file = args.work_dir.join("title.txt");
    let subtitle_file = args.work_dir.join("subtitle.txt");
    caption::write_lines(&title_file, &[args.title.clone()])?;
    caption::write_lines(&subtitle_file, &[args.subtitle.clone()])?;
    let filter = caption::thumbnail_filter(
        &style,
        &title_file,
        &args.title,
        &subtitle_file,
        &args.subtitle,
    );

    let mut made = 0;
    for image in pool::list_media(&[&args.images], MediaKind::Image)? {
        let output = args
            .out_dir
            .join(format!("thumbnail_{}.jpg", image.file_stem()));
        match session
            .ffmpeg
            .run(&assemble::still_frame_args(&image.path, &filter, &output))
            .await
        {
            Ok(()) => {
                info!("Thumbnail saved to {}", output.display());
                made += 1;
            }
            Err(e) => warn!("Skipping {}: {:#}", image.path.display(), e),
        }
    }
    Ok(made)
}

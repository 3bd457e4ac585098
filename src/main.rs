mod ai;
mod assemble;
mod audio;
mod caption;
mod capture;
mod ffmpeg;
mod highlights;
mod images;
mod pipeline;
mod playlist;
mod pool;
mod probe;
mod schedule;
mod workspace;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pipeline::Session;

#[derive(Parser)]
#[command(name = "reelsmith")]
#[command(about = "Build narrated videos from image folders, clips and music", long_about = None)]
struct Cli {
    /// ffmpeg executable used for encoding
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
    /// Seed for shuffles and random picks
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the concat playlist a slideshow would use
    Schedule(pipeline::ScheduleCommand),
    /// Turn image folders into a video, optionally over narration
    Slideshow(pipeline::SlideshowCommand),
    /// Read a script aloud with OpenAI speech
    Narrate(pipeline::NarrateCommand),
    /// Lay narration over background music
    Mix(pipeline::MixCommand),
    /// Script to narrated slideshow in one go
    Longform(pipeline::LongformCommand),
    /// Cut narrated vertical clips out of source videos
    Shorts(pipeline::ShortsCommand),
    /// Stitch random highlights of each source video over a beat
    Montage(pipeline::MontageCommand),
    /// Convert webp images and crop them to squares
    PrepareImages(pipeline::PrepareImagesCommand),
    /// Overlay a random quote from each person's list on their images
    CaptionImages(pipeline::CaptionImagesCommand),
    /// Title and subtitle cards on 1280x720 frames
    Thumbnails(pipeline::ThumbnailsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let mut session = Session {
        ffmpeg: ffmpeg::Ffmpeg::new(cli.ffmpeg),
        rng: match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        },
    };

    match cli.command {
        Command::Schedule(args) => pipeline::print_schedule(&mut session, args)?,
        Command::Slideshow(args) => {
            let output = pipeline::slideshow(&mut session, args).await?;
            info!("Final video: {}", output.display());
        }
        Command::Narrate(args) => {
            pipeline::narrate(&mut session, args).await?;
        }
        Command::Mix(args) => {
            pipeline::mix(&mut session, args).await?;
        }
        Command::Longform(args) => {
            let output = pipeline::longform(&mut session, args).await?;
            info!("Final video: {}", output.display());
        }
        Command::Shorts(args) => pipeline::shorts(&mut session, args).await?,
        Command::Montage(args) => pipeline::montage(&mut session, args).await?,
        Command::PrepareImages(args) => pipeline::prepare_images(args)?,
        Command::CaptionImages(args) => {
            pipeline::caption_images(&mut session, args).await?;
        }
        Command::Thumbnails(args) => {
            pipeline::thumbnails(&mut session, args).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_slideshow_flags() {
        let cli = Cli::try_parse_from([
            "reelsmith",
            "--seed",
            "7",
            "slideshow",
            "images/a",
            "images/b",
            "--audio",
            "narration.mp3",
            "--mode",
            "exact-fill",
            "--per-item",
            "120",
            "--shuffle",
            "--hold",
            "--style",
            "ken-burns",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(7));
        assert!(matches!(cli.command, Command::Slideshow(_)));
    }

    #[test]
    fn fixed_count_requires_count() {
        let result = Cli::try_parse_from([
            "reelsmith",
            "schedule",
            "images",
            "--duration",
            "780",
            "--mode",
            "fixed-count",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_caption_and_thumbnail_commands() {
        let cli = Cli::try_parse_from([
            "reelsmith",
            "caption-images",
            "source_material/boxing/boxer_images",
            "--quotes",
            "quotes.json",
            "--font-size",
            "72",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::CaptionImages(_)));

        assert!(Cli::try_parse_from(["reelsmith", "thumbnails", "images"]).is_err());
        let cli = Cli::try_parse_from([
            "reelsmith",
            "thumbnails",
            "images",
            "--title",
            "Horus Heresy",
            "--subtitle",
            "Part One",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Thumbnails(_)));
    }

    #[test]
    fn negative_gains_parse() {
        let cli = Cli::try_parse_from([
            "reelsmith",
            "mix",
            "narration.mp3",
            "--music",
            "music",
            "--music-gain",
            "-18",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Mix(_)));
    }
}

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use cardcast::{CardGenerator, CardSpec, CardStyle, VideoGenerator, ZoomConfig};

#[derive(Parser, Debug)]
#[command(name = "cardcast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an article card as a PNG.
    Card(CardArgs),
    /// Render a zoom MP4 from a card image (requires `ffmpeg` on PATH).
    Video(VideoArgs),
}

#[derive(Parser, Debug)]
struct CardArgs {
    /// Article title.
    #[arg(long)]
    title: String,

    /// Category badge text; empty hides the badge.
    #[arg(long, default_value = "")]
    category: String,

    /// Background image URL or local path.
    #[arg(long)]
    image: Option<String>,

    /// Style overrides JSON; missing fields keep their defaults.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Input card image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Clip duration in seconds.
    #[arg(long)]
    duration: Option<u32>,

    /// Frame rate.
    #[arg(long)]
    fps: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Card(args) => {
            let style = match &args.style {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("read style file '{}'", path.display()))?;
                    serde_json::from_str::<CardStyle>(&raw)
                        .with_context(|| format!("parse style file '{}'", path.display()))?
                }
                None => CardStyle::default(),
            };

            let spec = CardSpec {
                title: args.title,
                category: args.category,
                image_source: args.image,
            };
            let mut generator = CardGenerator::with_style(style);
            let card = generator.generate(&spec, &args.out)?;
            println!(
                "card written to {} ({}x{})",
                card.path.display(),
                card.image.width(),
                card.image.height()
            );
        }
        Command::Video(args) => {
            let mut config = ZoomConfig::default();
            if let Some(duration) = args.duration {
                config.duration_s = duration;
            }
            if let Some(fps) = args.fps {
                config.fps = fps;
            }

            let generator = VideoGenerator::with_config(config);
            let video = generator.generate_with_progress(&args.in_path, &args.out, |pct| {
                eprint!("\rencoding... {pct}%");
            })?;
            eprintln!();
            println!(
                "video written to {} ({} frames)",
                video.path.display(),
                video.frame_count
            );
        }
    }
    Ok(())
}

//! `Shortsmith` CLI - render branded vertical shorts from videos and captions

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shortsmith::{AppConfig, EncoderPreference, LayoutMode, Size};

#[derive(Parser)]
#[command(name = "shortsmith")]
#[command(about = "Turn a video and a caption into a branded 1080x1920 short")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/shortsmith/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one output video per item
    Render {
        /// Layout mode (full or mid)
        #[arg(short, long)]
        mode: Option<LayoutMode>,

        /// Item as SOURCE::CAPTION, where SOURCE is a file path or a link
        #[arg(short, long = "item", value_name = "SOURCE::CAPTION")]
        items: Vec<String>,

        /// TOML manifest with `mode` and `[[items]]` (caption, upload, link)
        #[arg(long, conflicts_with = "items")]
        manifest: Option<PathBuf>,

        /// Keep rendering after a failed item
        #[arg(long)]
        continue_on_error: bool,

        /// Video encoder: auto, hardware (NVENC) or software (libx264)
        #[arg(long)]
        encoder: Option<EncoderPreference>,
    },

    /// Download a share link to a local file
    Resolve {
        /// Google Drive, OneDrive or direct link
        url: String,

        /// Destination file
        #[arg(short, long, default_value = "input.mp4")]
        output: PathBuf,
    },

    /// Render a caption image to PNG
    Caption {
        /// Caption text
        text: String,

        /// Destination PNG
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the layout plan and filter graph as JSON
    Plan {
        /// Layout mode (full or mid)
        #[arg(short, long, default_value = "full")]
        mode: LayoutMode,

        /// Source video size, WIDTHxHEIGHT
        #[arg(long)]
        video: Size,

        /// Caption image size, WIDTHxHEIGHT
        #[arg(long)]
        caption: Size,

        /// Logo image size, WIDTHxHEIGHT (default: read from the configured logo)
        #[arg(long)]
        logo: Option<Size>,
    },

    /// Delete expired videos and caption images from the output directory
    Sweep {
        /// Keep sweeping on the configured interval until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn,shortsmith=info",
        1 => "info,shortsmith=debug",
        _ => "debug,shortsmith=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            mode,
            items,
            manifest,
            continue_on_error,
            encoder,
        } => {
            if let Some(encoder) = encoder {
                config.encoder = encoder;
            }
            if continue_on_error {
                config.continue_on_error = true;
            }
            cmd::cmd_render(&config, mode, &items, manifest.as_deref()).await?;
        }
        Commands::Resolve { url, output } => {
            cmd::cmd_resolve(&config, &url, &output).await?;
        }
        Commands::Caption { text, output } => {
            cmd::cmd_caption(&config, &text, &output)?;
        }
        Commands::Plan {
            mode,
            video,
            caption,
            logo,
        } => {
            cmd::cmd_plan(&config, mode, video, caption, logo)?;
        }
        Commands::Sweep { watch } => {
            cmd::cmd_sweep(&config, watch).await?;
        }
    }

    Ok(())
}

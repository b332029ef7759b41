mod commands;
mod context;
mod replay;
mod telemetry;
mod trigger;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::bluesky::BlueskyCommand;
use commands::capture::CaptureArgs;
use commands::config::ConfigArgs;
use commands::feed::FeedArgs;
use commands::interact::{CommentArgs, LikeArgs, UncommentArgs};
use context::AppContext;

/// Authentic Moments: one take, sixty seconds, no retakes.
#[derive(Parser, Debug)]
#[command(name = "moments", version, about, long_about = None)]
struct Cli {
    /// Config file to load after the system and user files
    #[arg(short, long, global = true, env = "MOMENTS_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture and share a moment
    Capture(CaptureArgs),

    /// Show recently shared moments
    Feed(FeedArgs),

    /// Like a moment, or take your like back
    Like(LikeArgs),

    /// Comment on a moment
    Comment(CommentArgs),

    /// Delete one of your comments
    Uncomment(UncommentArgs),

    /// Bluesky cross-post account
    #[command(subcommand)]
    Bluesky(BlueskyCommand),

    /// Print the effective configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());
    }
    let ctx = AppContext::load(cli.config.as_deref())?;

    let _telemetry =
        telemetry::init(&ctx.config.infra.telemetry).context("Failed to initialize logging")?;
    tracing::debug!(files = ?ctx.sources.files, env = ?ctx.sources.env_overrides, "configuration loaded");

    match cli.command {
        Commands::Capture(args) => commands::capture::run(&ctx, args).await,
        Commands::Feed(args) => commands::feed::run(&ctx, args),
        Commands::Like(args) => commands::interact::like(&ctx, args),
        Commands::Comment(args) => commands::interact::comment(&ctx, args),
        Commands::Uncomment(args) => commands::interact::uncomment(&ctx, args),
        Commands::Bluesky(command) => commands::bluesky::run(&ctx, command).await,
        Commands::Config(args) => commands::config::run(&ctx, args),
    }
}

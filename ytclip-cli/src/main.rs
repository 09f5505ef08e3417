//! ytclip command-line shell
//!
//! Provisions FFmpeg and yt-dlp, then cuts clips out of online videos.

mod report;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use ytclip_core::{
    event_channel, AppEvent, AppPaths, ClipDownloader, ClipRequest, EventSink, MessageStatus,
    Section, Settings, Setup,
};

/// Download sections of online videos with yt-dlp.
#[derive(Parser, Debug)]
#[command(name = "ytclip")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Print events as JSON lines instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install FFmpeg and yt-dlp if they are missing
    Setup,
    /// Download a section of a video
    Clip {
        /// Video URL
        #[arg(long)]
        url: String,
        /// Section start, e.g. 90 or 00:01:30
        #[arg(long)]
        start: String,
        /// Section end, e.g. 120 or 00:02:00
        #[arg(long)]
        end: String,
    },
    /// Show where ytclip keeps its files
    Paths,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ytclip=debug".parse()?)
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting ytclip v{}", ytclip_core::VERSION);

    let cli = Cli::parse();
    let paths = AppPaths::resolve();
    let settings = Settings::load(&paths.settings_path());

    if let Command::Paths = cli.command {
        report::print_paths(&paths, &settings);
        return Ok(());
    }

    let (tx, rx) = event_channel();
    let printer = tokio::spawn(report::print_events(rx, cli.json));

    let result = run(cli.command, paths, &settings, &tx).await;

    match &result {
        Ok(()) => tx.emit(AppEvent::message(MessageStatus::Success, "Done")),
        Err(e) => tx.emit(AppEvent::message(MessageStatus::Error, format!("{e:#}"))),
    }

    // Closing the channel lets the printer drain and exit.
    drop(tx);
    printer.await.context("Event printer failed")?;

    result
}

async fn run(
    command: Command,
    paths: AppPaths,
    settings: &Settings,
    tx: &ytclip_core::EventSender,
) -> Result<()> {
    let setup = Setup::new(paths.clone(), settings, Arc::new(tx.clone()));
    setup
        .install()
        .await
        .context("Failed to set up FFmpeg and yt-dlp")?;
    tx.emit(AppEvent::ResourceFinish);

    match command {
        Command::Setup | Command::Paths => Ok(()),
        Command::Clip { url, start, end } => {
            let section = Section::new(start, end)?;
            let request = ClipRequest::new(url, section);
            let downloader = ClipDownloader::new(&paths, settings);

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Ctrl-C received, cancelling download");
                    on_ctrl_c.cancel();
                }
            });

            downloader
                .download(&request, &cancel, tx)
                .await
                .with_context(|| format!("Failed to download {}", request.url))?;

            tracing::info!(
                "Clip saved under {}",
                downloader.output_dir().display()
            );
            Ok(())
        }
    }
}

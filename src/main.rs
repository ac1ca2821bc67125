mod batch;
mod capture;
mod command;
mod config;
mod error;
mod output;
mod session;

use anyhow::{Context, Result};
use capture::WebcamCapture;
use clap::{CommandFactory, Parser, Subcommand};
use config::{BatchLayout, CollectOptions, SessionConfig, WRAP_CEILING};
use output::{NoPreview, OutputSink, PreviewWindow};
use session::CaptureSession;
use std::path::PathBuf;

/// Camera tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect images from camera
    Collect(CollectArgs),

    /// List the camera indices that deliver frames
    Show,
}

#[derive(clap::Args, Debug)]
struct CollectArgs {
    /// Frames per second
    #[arg(long, default_value_t = 5.0)]
    fps: f64,

    /// Input webcam device index
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=2))]
    camera: u32,

    /// Requested capture width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Directory the images are written to
    #[arg(long, default_value = "collect_pics")]
    outdir: PathBuf,

    /// File listing the images of the latest batch
    #[arg(long, default_value = "batch.txt")]
    batchfile: PathBuf,

    /// File polled for stop/end/batch commands
    #[arg(long, default_value = "cmd.txt")]
    cmdfile: PathBuf,

    /// Wrap image ids back to 000000 after a million frames
    #[arg(long)]
    wrap: bool,

    /// Write the batch file without the leading sequence line
    #[arg(long)]
    plain_batch: bool,

    /// Do not open the preview window
    #[arg(long)]
    no_preview: bool,
}

impl CollectArgs {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            device_index: self.camera,
            fps: self.fps,
            width: self.width,
            height: self.height,
            cmdfile: self.cmdfile.clone(),
        }
    }

    fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            outdir: self.outdir.clone(),
            batchfile: self.batchfile.clone(),
            id_ceiling: self.wrap.then_some(WRAP_CEILING),
            batch_layout: if self.plain_batch {
                BatchLayout::Plain
            } else {
                BatchLayout::Sequenced
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::Collect(args)) => collect(&args),
        Some(Commands::Show) => {
            let cameras = capture::show_all_cameras();
            println!("{:?}", cameras);
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn collect(args: &CollectArgs) -> Result<()> {
    let config = args.session_config();
    let options = args.collect_options();

    tracing::info!("Target FPS: {}", config.fps);

    // Initialize capture
    let capture = WebcamCapture::open(&config);

    // Initialize preview
    let preview: Box<dyn OutputSink> = if args.no_preview {
        Box::new(NoPreview)
    } else {
        let (width, height) = capture::CaptureSource::resolution(&capture);
        match PreviewWindow::new(width, height) {
            Ok(window) => Box::new(window),
            Err(e) => {
                tracing::warn!("Failed to open preview window, continuing without it: {}", e);
                Box::new(NoPreview)
            }
        }
    };

    let mut session =
        CaptureSession::new(config, capture, preview).context("Invalid session configuration")?;

    let summary = session
        .collect(&options)
        .context("Capture loop failed")?;

    tracing::info!(
        "Collected {} frames in {} batches ({:?})",
        summary.frames,
        summary.batches,
        summary.stop
    );

    Ok(())
}

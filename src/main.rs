//! `parallax-depth` CLI - Generate depth maps for parallax effects.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parallax_depth::{image, Config, Device, MidasSize, ModelKind, Pipeline};

/// Depth estimation backend.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    /// Depth Anything V2 Small.
    DepthAnythingV2,
    /// MiDaS, sized with --midas-size.
    Midas,
}

/// Generate depth maps from 2D images for parallax effects.
#[derive(Parser, Debug)]
#[command(name = "parallax-depth")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image path (JPG, PNG, etc.).
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output depth map path [default: <INPUT stem>_depth.png next to the input].
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Depth estimation model.
    #[arg(short, long, value_enum, default_value_t = ModelArg::DepthAnythingV2)]
    model: ModelArg,

    /// MiDaS model size: small, base or large.
    #[arg(long, default_value_t = MidasSize::Large, value_name = "SIZE")]
    midas_size: MidasSize,

    /// Invert depth map (white = far, black = near).
    #[arg(long)]
    invert: bool,

    /// Device to use: cpu, gpu (alias cuda) or unified (alias mps)
    /// [default: auto-detect gpu, then unified, then cpu].
    #[arg(long, value_name = "DEVICE")]
    device: Option<Device>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn model_kind(&self) -> ModelKind {
        match self.model {
            ModelArg::DepthAnythingV2 => ModelKind::DepthAnythingV2,
            ModelArg::Midas => ModelKind::Midas(self.midas_size),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("parallax_depth={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(err) = run(&args) {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| image::default_output_path(&args.input));

    let config = Config {
        model: args.model_kind(),
        device: args.device,
        invert: args.invert,
    };

    // Load the image before the model so a bad path fails fast
    let rgb = image::load_image(&args.input).context("Failed to load input image")?;

    let mut pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;

    pipeline
        .process_image(rgb, &output)
        .context("Failed to generate depth map")?;

    println!(
        "Successfully generated {} -> {} on {}",
        args.input.display(),
        output.display(),
        pipeline.device()
    );

    Ok(())
}

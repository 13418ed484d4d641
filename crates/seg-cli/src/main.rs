//! seg - label-propagation image segmentation CLI
//!
//! Segments a grayscale image into same-intensity connected regions on the
//! GPU (wgpu) or CPU and writes a colourised label map.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

#[derive(Parser)]
#[command(name = "seg")]
#[command(author, version, about = "Label-propagation image segmentation")]
#[command(long_about = "
Segments a grayscale image into connected regions of equal (or similar)
intensity by iterative minimum-label propagation.

Examples:
  seg segment photo.png -o regions.png          # Segment and colourise
  seg segment photo.png --stats --verify        # Region stats, fixpoint check
  seg segment tiny.png --labels                 # Print the label matrix
  seg segment photo.png -b cpu -c 8 -t 2        # CPU, 8-connected, tolerance 2
  seg backends                                  # List compute backends
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment an image into labelled regions
    #[command(visible_alias = "s")]
    Segment(SegmentArgs),

    /// List compute backends
    #[command(visible_alias = "b")]
    Backends,
}

/// Arguments for the `segment` command.
#[derive(Args)]
struct SegmentArgs {
    /// Input image (converted to 8-bit grayscale)
    input: PathBuf,

    /// Output image for the colourised labels
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the label matrix
    #[arg(long)]
    labels: bool,

    /// Print region statistics
    #[arg(short, long)]
    stats: bool,

    /// Check the result is a fixpoint on the CPU reference kernels
    #[arg(long)]
    verify: bool,

    /// Compute backend: auto, cpu, wgpu
    #[arg(short, long, default_value = "auto")]
    backend: String,

    /// Pixel neighbourhood: 4 or 8
    #[arg(short, long, default_value = "4")]
    connectivity: String,

    /// Maximum intensity difference inside one region
    #[arg(short, long, default_value = "0")]
    tolerance: u8,

    /// Iteration cap: auto, none, or a number
    #[arg(long = "max-iterations", default_value = "auto")]
    max_iterations: String,

    /// Buffer handover between rounds: swap, copy-back
    #[arg(long, default_value = "swap")]
    strategy: String,

    /// External WGSL kernel module
    #[arg(short, long)]
    kernel: Option<PathBuf>,

    /// Palette seed for the colourised output
    #[arg(long, default_value = "0")]
    seed: u64,
}

/// Install the stderr subscriber and, with `--log`, a file sink.
///
/// `RUST_LOG` overrides the level derived from `-v`.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file: {}", path.display()))?;
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install logger")?;

    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_logging(cli.verbose, cli.log.as_deref())?;

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Segment(args) => commands::segment::run(args, cli.verbose),
        Commands::Backends => commands::backends::run(cli.verbose),
    }
}

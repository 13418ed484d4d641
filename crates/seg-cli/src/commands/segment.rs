//! Segment command
//!
//! Loads an image as grayscale, runs label propagation and reports or
//! writes the result.

use crate::SegmentArgs;
use anyhow::{Result, bail};
use seg_compute::{
    Backend, BufferStrategy, Connectivity, EngineConfig, IterationLimit, KernelModule, KernelParams, Segmenter,
    verify_fixpoint,
};
use seg_core::LabelPalette;
use std::time::Instant;
use tracing::{debug, info, trace};

pub fn run(args: SegmentArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input.display(), backend = %args.backend, "segment::run");

    let backend: Backend = args.backend.parse()?;
    let params = KernelParams::new()
        .with_connectivity(args.connectivity.parse::<Connectivity>().map_err(anyhow::Error::msg)?)
        .with_tolerance(args.tolerance);
    let config = EngineConfig::new()
        .with_params(params)
        .with_iteration_limit(parse_iteration_limit(&args.max_iterations)?)
        .with_strategy(parse_strategy(&args.strategy)?);

    let kernel = match &args.kernel {
        Some(path) => KernelModule::from_file(path)?,
        None => KernelModule::builtin(),
    };

    let image = super::load_image(&args.input)?;
    let (width, height) = image.dimensions();
    debug!(width, height, "loaded input");

    let mut segmenter = Segmenter::with_kernel(backend, config, kernel)?;
    if verbose > 0 {
        println!("Running on {}", segmenter.backend_name());
    }

    let palette = LabelPalette::new(args.seed);
    let start = Instant::now();
    let (result, rgb) = if args.output.is_some() {
        let (result, rgb) = segmenter.segment_and_present(&image, &palette)?;
        (result, Some(rgb))
    } else {
        (segmenter.segment(&image)?, None)
    };
    let elapsed = start.elapsed();

    info!(iterations = result.iterations, regions = result.regions(), ?elapsed, "segmented");
    println!(
        "Took {} iterations ({}) on {}",
        result.iterations,
        super::format_duration(elapsed),
        result.backend
    );

    if args.labels {
        print!("{}", result.labels);
    }

    if args.stats {
        print_stats(&result.labels);
    }

    if args.verify {
        if !verify_fixpoint(&image, &result.labels, &params) {
            bail!("Labels are not a fixpoint of the propagation rule");
        }
        println!("Fixpoint verified");
    }

    if let (Some(output), Some(rgb)) = (&args.output, rgb) {
        super::save_rgb(output, width, height, rgb)?;
        if verbose > 0 {
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}

fn print_stats(labels: &seg_core::LabelGrid) {
    let sizes = labels.region_sizes();
    let pixels = labels.as_slice().len();
    println!("  Resolution: {}x{}", labels.width(), labels.height());
    println!("  Regions:    {}", sizes.len());

    let mut largest: Vec<_> = sizes.into_iter().collect();
    largest.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (label, size) in largest.iter().take(5) {
        println!(
            "  Label {:>8}: {:>8} px ({:.1}%)",
            label,
            size,
            *size as f64 * 100.0 / pixels as f64
        );
    }
}

fn parse_iteration_limit(value: &str) -> Result<IterationLimit> {
    match value.to_lowercase().as_str() {
        "auto" => Ok(IterationLimit::Auto),
        "none" | "unbounded" => Ok(IterationLimit::Unbounded),
        n => match n.parse::<u32>() {
            Ok(n) if n > 0 => Ok(IterationLimit::Fixed(n)),
            _ => bail!("Invalid --max-iterations '{}' (expected auto, none or a positive number)", value),
        },
    }
}

fn parse_strategy(value: &str) -> Result<BufferStrategy> {
    match value.to_lowercase().as_str() {
        "swap" => Ok(BufferStrategy::Swap),
        "copy-back" | "copyback" | "copy" => Ok(BufferStrategy::CopyBack),
        _ => bail!("Invalid --strategy '{}' (expected swap or copy-back)", value),
    }
}

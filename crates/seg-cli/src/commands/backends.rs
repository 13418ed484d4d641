//! Backends command
//!
//! Lists compute backends and the one `auto` resolves to.

use anyhow::Result;
use seg_compute::{describe_backends, select_best_backend};
use tracing::trace;

pub fn run(verbose: u8) -> Result<()> {
    trace!("backends::run");

    print!("{}", describe_backends());
    println!("Auto selects: {}", select_best_backend());

    #[cfg(feature = "wgpu")]
    {
        match seg_compute::GpuContext::new() {
            Ok(context) => {
                println!("GPU device: {} ({:?})", context.device_name(), context.backend());
                if verbose > 0 {
                    let limits = context.limits();
                    println!("  Max buffer:      {} bytes", limits.max_buffer_size);
                    println!("  Max workgroups:  {}", limits.max_compute_workgroups_per_dimension);
                }
            }
            Err(e) => println!("GPU device: none ({})", e),
        }
    }

    #[cfg(not(feature = "wgpu"))]
    {
        if verbose > 0 {
            println!("Built without the wgpu feature");
        }
    }

    Ok(())
}

//! Iterative minimum-label propagation on CPU and GPU compute surfaces.
//!
//! Every pixel starts with a unique label and repeatedly adopts the
//! smallest label among its same-region neighbours until a round changes
//! nothing. Each round runs entirely on the compute surface; only the
//! difference signal crosses back to the host.
//!
//! # Architecture
//!
//! ```text
//! Segmenter (facade, Box<dyn SegmentationBackend>)
//!     └── LabelEngine<S: ComputeSurface>
//!             ├── CpuSurface  (rayon reference kernels)
//!             └── WgpuSurface (WGSL compute shaders)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use seg_compute::{Segmenter, Backend};
//! use seg_core::GrayImage;
//!
//! let image = GrayImage::from_rows(&[[1u8, 1, 2], [1, 2, 2]])?;
//! let mut segmenter = Segmenter::new(Backend::Auto)?;
//! let result = segmenter.segment(&image)?;
//! println!("{} regions in {} iterations", result.regions(), result.iterations);
//! ```

pub mod backend;
#[cfg(feature = "wgpu")]
pub mod context;
pub mod engine;
pub mod kernel;
pub mod params;
pub mod reference;
pub mod segmenter;
mod shaders;

pub use backend::{
    Backend, ComputeSurface, CpuSurface, DeviceBuffer, DeviceLimits, describe_backends, detect_backends,
    select_best_backend,
};
#[cfg(feature = "wgpu")]
pub use backend::WgpuSurface;
#[cfg(feature = "wgpu")]
pub use context::GpuContext;
pub use engine::{BufferStrategy, EngineConfig, IterationLimit, LabelEngine, Segmentation};
pub use kernel::{KERNEL_INTERFACE_VERSION, KernelInterface, KernelModule};
pub use params::{Connectivity, KernelParams};
pub use reference::verify_fixpoint;
pub use segmenter::{SegmentationBackend, Segmenter};

use std::path::PathBuf;

use thiserror::Error;

/// Compute errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Compute device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to read kernel module {}: {source}", path.display())]
    KernelLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to compile kernel module: {0}")]
    KernelCompile(String),

    #[error("Kernel contract violated by '{entry_point}': {reason}")]
    KernelContract { entry_point: String, reason: String },

    #[error("Dispatch of '{kernel}' failed: {reason}")]
    Dispatch { kernel: &'static str, reason: String },

    #[error("Transfer '{op}' failed: {reason}")]
    Transfer { op: &'static str, reason: String },

    #[error("No fixpoint after {iterations} iterations (limit {limit})")]
    Divergence { iterations: u32, limit: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Empty image: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("Image too large: {width}x{height} needs {required}, device limit {limit}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        required: u64,
        limit: u64,
    },

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Core(#[from] seg_core::Error),
}

pub type ComputeResult<T> = Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ComputeError::Divergence { iterations: 7, limit: 6 };
        assert_eq!(err.to_string(), "No fixpoint after 7 iterations (limit 6)");

        let err = ComputeError::KernelContract {
            entry_point: "compare_grids".into(),
            reason: "missing".into(),
        };
        assert!(err.to_string().contains("compare_grids"));
    }

    #[test]
    fn test_core_error_is_transparent() {
        let core = seg_core::Error::dimension_mismatch((2, 2), (3, 3));
        let msg = core.to_string();
        let err: ComputeError = core.into();
        assert_eq!(err.to_string(), msg);
    }
}

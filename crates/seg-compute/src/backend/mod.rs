//! Compute surfaces for the label kernels.
//!
//! Provides a CPU (rayon) surface and a wgpu surface with automatic selection.
//!
//! # Architecture
//!
//! ```text
//! LabelEngine<S: ComputeSurface>
//!     +-- CpuSurface  (rayon parallelization)
//!     +-- WgpuSurface (Vulkan/Metal/DX12)
//! ```

mod cpu_backend;
mod detect;
mod limits;
mod surface;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use cpu_backend::{CpuGrid, CpuImage, CpuSurface};
pub use detect::{BackendInfo, describe_backends, detect_backends, select_best_backend};
pub use limits::{BYTES_PER_PIXEL, DeviceLimits, MAX_PIXELS};
pub use surface::{ComputeSurface, DeviceBuffer};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuDiff, WgpuImage, WgpuLabels, WgpuSurface};

use std::fmt;
use std::str::FromStr;

use crate::{ComputeError, ComputeResult};

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available (wgpu > CPU).
    #[default]
    Auto,
    /// CPU backend using rayon for parallelization.
    Cpu,
    /// wgpu backend (Vulkan/Metal/DX12).
    Wgpu,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Cpu => true,
            #[cfg(feature = "wgpu")]
            Self::Wgpu => WgpuSurface::is_available(),
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Wgpu => "wgpu",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(ComputeError::BackendNotAvailable(format!("unknown backend '{other}'"))),
        }
    }
}

/// Fail with a dimension mismatch unless both buffers have the same shape.
pub(crate) fn ensure_same_shape(a: &impl DeviceBuffer, b: &impl DeviceBuffer) -> ComputeResult<()> {
    if a.dimensions() == b.dimensions() {
        Ok(())
    } else {
        Err(seg_core::Error::dimension_mismatch(a.dimensions(), b.dimensions()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("cpu".parse::<Backend>().unwrap(), Backend::Cpu);
        assert_eq!("WGPU".parse::<Backend>().unwrap(), Backend::Wgpu);
        assert_eq!(" auto ".parse::<Backend>().unwrap(), Backend::Auto);
        assert!("cuda".parse::<Backend>().is_err());
    }

    #[test]
    fn test_backend_availability() {
        assert!(Backend::Auto.is_available());
        assert!(Backend::Cpu.is_available());
        assert_eq!(Backend::Wgpu.to_string(), "wgpu");
    }
}

//! CPU surface using rayon for parallelization.
//!
//! Buffers live in host memory and kernels are the reference
//! implementations, so this surface doubles as the oracle for the GPU path.

use seg_core::GrayImage;

use super::surface::{ComputeSurface, DeviceBuffer};
use super::{DeviceLimits, ensure_same_shape};
use crate::params::KernelParams;
use crate::{ComputeResult, reference};

/// Image samples held in RAM together with the predicate parameters.
pub struct CpuImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    params: KernelParams,
}

impl CpuImage {
    /// Same-region parameters bound to this image.
    pub fn params(&self) -> &KernelParams {
        &self.params
    }
}

impl DeviceBuffer for CpuImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// `u32` grid held in RAM; used for labels and the difference signal.
pub struct CpuGrid {
    data: Vec<u32>,
    width: u32,
    height: u32,
}

impl CpuGrid {
    fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Grid contents.
    pub fn data(&self) -> &[u32] {
        &self.data
    }
}

impl DeviceBuffer for CpuGrid {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// CPU compute surface.
pub struct CpuSurface {
    limits: DeviceLimits,
}

impl CpuSurface {
    /// Surface sized to the available system RAM.
    pub fn new() -> Self {
        // System RAM, falling back to 4 GB if detection fails
        let available = sys_info::mem_info()
            .map(|m| m.avail * 1024)
            .unwrap_or(4 * 1024 * 1024 * 1024);

        Self {
            limits: DeviceLimits {
                max_grid_dim: u32::MAX,
                max_buffer_bytes: u64::MAX,
                available_memory: available,
            },
        }
    }

    /// Surface with explicit limits.
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self { limits }
    }
}

impl Default for CpuSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeSurface for CpuSurface {
    type Image = CpuImage;
    type Labels = CpuGrid;
    type Diff = CpuGrid;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    fn upload_image(&self, image: &GrayImage, params: &KernelParams) -> ComputeResult<Self::Image> {
        Ok(CpuImage {
            data: image.as_slice().to_vec(),
            width: image.width(),
            height: image.height(),
            params: *params,
        })
    }

    fn allocate_labels(&self, width: u32, height: u32) -> ComputeResult<Self::Labels> {
        Ok(CpuGrid::new(width, height))
    }

    fn allocate_diff(&self, width: u32, height: u32) -> ComputeResult<Self::Diff> {
        Ok(CpuGrid::new(width, height))
    }

    fn init_labels(&self, image: &Self::Image, out: &mut Self::Labels) -> ComputeResult<()> {
        ensure_same_shape(image, out)?;
        reference::init_labels(out.width, &mut out.data);
        Ok(())
    }

    fn propagate(&self, image: &Self::Image, src: &Self::Labels, dst: &mut Self::Labels) -> ComputeResult<()> {
        ensure_same_shape(image, src)?;
        ensure_same_shape(image, dst)?;
        reference::propagate_min_label(
            &image.data,
            image.width,
            image.height,
            &image.params,
            &src.data,
            &mut dst.data,
        );
        Ok(())
    }

    fn compare(&self, a: &Self::Labels, b: &Self::Labels, diff: &mut Self::Diff) -> ComputeResult<()> {
        ensure_same_shape(a, b)?;
        ensure_same_shape(a, diff)?;
        reference::compare_grids(&a.data, &b.data, &mut diff.data);
        Ok(())
    }

    fn copy_labels(&self, src: &Self::Labels, dst: &mut Self::Labels) -> ComputeResult<()> {
        ensure_same_shape(src, dst)?;
        dst.data.copy_from_slice(&src.data);
        Ok(())
    }

    fn read_diff(&self, diff: &Self::Diff) -> ComputeResult<Vec<u32>> {
        Ok(diff.data.clone())
    }

    fn download_labels(&self, labels: &Self::Labels) -> ComputeResult<Vec<u32>> {
        Ok(labels.data.clone())
    }
}

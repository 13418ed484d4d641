//! Compute surface abstraction shared by the CPU and wgpu backends.

use seg_core::GrayImage;

use super::DeviceLimits;
use crate::ComputeResult;
use crate::params::KernelParams;

/// Handle to a 2D buffer resident on a compute surface.
pub trait DeviceBuffer: Send + Sync {
    /// Grid dimensions (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Width.
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    /// Height.
    fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// Element count.
    fn len(&self) -> usize {
        let (w, h) = self.dimensions();
        w as usize * h as usize
    }

    /// `true` for a zero-sized buffer.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of device memory used.
    fn size_bytes(&self) -> u64 {
        self.len() as u64 * 4 // u32 elements
    }
}

/// Device context, memory and the three label kernels.
///
/// Operations are issued in program order and executed in that order.
/// Only [`read_diff`](Self::read_diff) and
/// [`download_labels`](Self::download_labels) block the caller; everything
/// else may be queued. Kernels take their inputs by `&` and outputs by
/// `&mut`, so an input grid can never alias the grid being written.
pub trait ComputeSurface: Send + Sync {
    /// Device-resident image plus its same-region parameters.
    type Image: DeviceBuffer;
    /// Device-resident label grid.
    type Labels: DeviceBuffer;
    /// Device-resident difference signal.
    type Diff: DeviceBuffer;

    /// Backend name.
    fn name(&self) -> &'static str;

    /// Device limits used for capacity checks.
    fn limits(&self) -> &DeviceLimits;

    /// Upload image samples and kernel parameters.
    fn upload_image(&self, image: &GrayImage, params: &KernelParams) -> ComputeResult<Self::Image>;

    /// Allocate an uninitialised label grid.
    fn allocate_labels(&self, width: u32, height: u32) -> ComputeResult<Self::Labels>;

    /// Allocate a difference buffer with one element per pixel.
    fn allocate_diff(&self, width: u32, height: u32) -> ComputeResult<Self::Diff>;

    /// `InitLabels(image) -> out`.
    fn init_labels(&self, image: &Self::Image, out: &mut Self::Labels) -> ComputeResult<()>;

    /// `PropagateMinLabel(src) -> dst` under the image's same-region predicate.
    fn propagate(&self, image: &Self::Image, src: &Self::Labels, dst: &mut Self::Labels) -> ComputeResult<()>;

    /// `CompareGrids(a, b) -> diff`.
    fn compare(&self, a: &Self::Labels, b: &Self::Labels, diff: &mut Self::Diff) -> ComputeResult<()>;

    /// Device-side copy `src -> dst`.
    fn copy_labels(&self, src: &Self::Labels, dst: &mut Self::Labels) -> ComputeResult<()>;

    /// Blocking read-back of the difference signal.
    fn read_diff(&self, diff: &Self::Diff) -> ComputeResult<Vec<u32>>;

    /// Blocking read-back of a label grid.
    fn download_labels(&self, labels: &Self::Labels) -> ComputeResult<Vec<u32>>;
}

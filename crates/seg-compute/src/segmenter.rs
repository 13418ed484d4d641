//! Segmentation facade.
//!
//! [`Segmenter`] hides the surface type behind [`SegmentationBackend`] so
//! callers pick a backend at runtime:
//!
//! ```ignore
//! use seg_compute::{Backend, EngineConfig, Segmenter};
//! use seg_core::LabelPalette;
//!
//! let mut segmenter = Segmenter::with_config(Backend::Wgpu, EngineConfig::default())?;
//! let (result, rgb) = segmenter.segment_and_present(&image, &LabelPalette::default())?;
//! ```

use seg_core::{GrayImage, LabelPalette};
use tracing::{debug, warn};

use crate::backend::{Backend, ComputeSurface, CpuSurface, select_best_backend};
use crate::engine::{EngineConfig, LabelEngine, Segmentation};
use crate::kernel::{KernelInterface, KernelModule};
use crate::ComputeResult;

/// Object-safe view of a [`LabelEngine`] over any surface.
pub trait SegmentationBackend: Send {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Run label propagation on `image`.
    fn segment(&mut self, image: &GrayImage) -> ComputeResult<Segmentation>;
}

impl<S: ComputeSurface> SegmentationBackend for LabelEngine<S> {
    fn name(&self) -> &'static str {
        self.surface().name()
    }

    fn segment(&mut self, image: &GrayImage) -> ComputeResult<Segmentation> {
        self.run(image)
    }
}

/// Runtime-selected segmentation engine.
pub struct Segmenter {
    engine: Box<dyn SegmentationBackend>,
    backend: Backend,
}

impl Segmenter {
    /// Segmenter on `backend` with the default configuration.
    pub fn new(backend: Backend) -> ComputeResult<Self> {
        Self::with_config(backend, EngineConfig::default())
    }

    /// Segmenter on the best available backend.
    pub fn auto() -> ComputeResult<Self> {
        Self::new(Backend::Auto)
    }

    pub fn with_config(backend: Backend, config: EngineConfig) -> ComputeResult<Self> {
        Self::with_kernel(backend, config, KernelModule::builtin())
    }

    /// Segmenter running an external kernel module.
    ///
    /// The module is checked against the kernel interface on every backend.
    /// Only the wgpu surface executes external modules, so `Auto` never
    /// falls back to CPU for one.
    ///
    /// # Errors
    ///
    /// - [`ComputeError::KernelContract`](crate::ComputeError::KernelContract) /
    ///   [`ComputeError::KernelCompile`](crate::ComputeError::KernelCompile) for a bad module
    /// - [`ComputeError::DeviceUnavailable`](crate::ComputeError::DeviceUnavailable) when
    ///   `Wgpu` is requested and no adapter exists
    /// - [`ComputeError::BackendNotAvailable`](crate::ComputeError::BackendNotAvailable) when
    ///   `Wgpu` is requested without the `wgpu` feature, or an external module
    ///   would run on the CPU surface
    pub fn with_kernel(backend: Backend, config: EngineConfig, kernel: KernelModule) -> ComputeResult<Self> {
        kernel.validate(&KernelInterface::v1())?;

        let resolved = match backend {
            Backend::Auto => select_best_backend(),
            other => other,
        };

        let engine: Box<dyn SegmentationBackend> = match resolved {
            Backend::Wgpu => match Self::create_wgpu(config, &kernel) {
                Ok(engine) => engine,
                Err(e) if backend == Backend::Auto && kernel.is_builtin() => {
                    warn!(error = %e, "wgpu unavailable, falling back to CPU");
                    Self::create_cpu(config, &kernel)?
                }
                Err(e) => return Err(e),
            },
            Backend::Cpu | Backend::Auto => Self::create_cpu(config, &kernel)?,
        };

        debug!(requested = %backend, backend = engine.name(), kernel = kernel.name(), "segmenter ready");

        Ok(Self { engine, backend })
    }

    fn create_cpu(config: EngineConfig, kernel: &KernelModule) -> ComputeResult<Box<dyn SegmentationBackend>> {
        if !kernel.is_builtin() {
            return Err(crate::ComputeError::BackendNotAvailable(format!(
                "kernel module '{}' needs the wgpu backend; the CPU surface runs only the built-in kernels",
                kernel.name()
            )));
        }
        Ok(Box::new(LabelEngine::with_config(CpuSurface::new(), config)))
    }

    #[cfg(feature = "wgpu")]
    fn create_wgpu(config: EngineConfig, kernel: &KernelModule) -> ComputeResult<Box<dyn SegmentationBackend>> {
        let context = crate::context::GpuContext::new()?;
        let surface = crate::backend::WgpuSurface::with_kernel(context, kernel)?;
        Ok(Box::new(LabelEngine::with_config(surface, config)))
    }

    #[cfg(not(feature = "wgpu"))]
    fn create_wgpu(_config: EngineConfig, _kernel: &KernelModule) -> ComputeResult<Box<dyn SegmentationBackend>> {
        Err(crate::ComputeError::BackendNotAvailable(
            "wgpu feature not enabled".to_string(),
        ))
    }

    /// Backend that was requested.
    pub fn requested_backend(&self) -> Backend {
        self.backend
    }

    /// Name of the backend actually running.
    pub fn backend_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Segment `image`.
    pub fn segment(&mut self, image: &GrayImage) -> ComputeResult<Segmentation> {
        self.engine.segment(image)
    }

    /// Segment `image` and colourise the labels as packed RGB8.
    pub fn segment_and_present(
        &mut self,
        image: &GrayImage,
        palette: &LabelPalette,
    ) -> ComputeResult<(Segmentation, Vec<u8>)> {
        let result = self.segment(image)?;
        let rgb = palette.colorize(&result.labels);
        Ok((result, rgb))
    }
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter")
            .field("requested", &self.backend)
            .field("backend", &self.engine.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComputeError;

    #[test]
    fn test_cpu_segmenter() {
        let mut segmenter = Segmenter::new(Backend::Cpu).unwrap();
        assert_eq!(segmenter.backend_name(), "cpu");
        let image = GrayImage::from_rows(&[[1u8, 1], [2, 2]]).unwrap();
        let result = segmenter.segment(&image).unwrap();
        assert_eq!(result.labels.as_slice(), &[0, 0, 2, 2]);
    }

    #[test]
    fn test_present() {
        let mut segmenter = Segmenter::new(Backend::Cpu).unwrap();
        let image = GrayImage::from_rows(&[[5u8, 5, 9]]).unwrap();
        let palette = LabelPalette::new(7);
        let (result, rgb) = segmenter.segment_and_present(&image, &palette).unwrap();
        assert_eq!(rgb.len(), 9);
        assert_eq!(&rgb[0..3], &palette.color(0));
        assert_eq!(&rgb[3..6], &palette.color(0));
        assert_eq!(&rgb[6..9], &palette.color(result.labels.as_slice()[2]));
    }

    #[test]
    fn test_bad_kernel_rejected_before_run() {
        let module = KernelModule::from_wgsl("empty", "// nothing here");
        let err = Segmenter::with_kernel(Backend::Cpu, EngineConfig::default(), module).unwrap_err();
        assert!(matches!(err, ComputeError::KernelContract { .. }));
    }

    #[test]
    fn test_external_kernel_refused_on_cpu() {
        let module = KernelModule::from_wgsl("copy", KernelModule::builtin().source().to_string());
        let err = Segmenter::with_kernel(Backend::Cpu, EngineConfig::default(), module).unwrap_err();
        match err {
            ComputeError::BackendNotAvailable(reason) => assert!(reason.contains("'copy'"), "{reason}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtin_kernel_runs_on_cpu() {
        let segmenter =
            Segmenter::with_kernel(Backend::Cpu, EngineConfig::default(), KernelModule::builtin()).unwrap();
        assert_eq!(segmenter.backend_name(), "cpu");
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_external_kernel_on_auto_without_gpu() {
        let module = KernelModule::from_wgsl("copy", KernelModule::builtin().source().to_string());
        let err = Segmenter::with_kernel(Backend::Auto, EngineConfig::default(), module).unwrap_err();
        assert!(matches!(err, ComputeError::BackendNotAvailable(_)));
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_wgpu_without_feature() {
        let err = Segmenter::new(Backend::Wgpu).unwrap_err();
        assert!(matches!(err, ComputeError::BackendNotAvailable(_)));
    }
}

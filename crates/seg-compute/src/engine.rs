//! Iterative label propagation driver.
//!
//! [`LabelEngine`] runs the initialise → propagate → compare → read diff →
//! swap loop on a [`ComputeSurface`] until a round leaves every label
//! unchanged. The host sees one blocking read per round (the difference
//! signal) and one final download.

use std::mem;

use seg_core::{GrayImage, LabelGrid};
use tracing::{debug, info};

use crate::backend::ComputeSurface;
use crate::params::KernelParams;
use crate::{ComputeError, ComputeResult};

/// Upper bound on propagation rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterationLimit {
    /// Loop until the fixpoint, however long it takes.
    Unbounded,
    /// At most `n` rounds.
    Fixed(u32),
    /// `pixel_count + 1` rounds: the longest same-region path plus the
    /// confirming round.
    #[default]
    Auto,
}

impl IterationLimit {
    /// Resolved bound for an image of `pixel_count` pixels, `None` if unbounded.
    pub fn resolve(self, pixel_count: usize) -> Option<u32> {
        match self {
            Self::Unbounded => None,
            Self::Fixed(n) => Some(n),
            Self::Auto => Some(u32::try_from(pixel_count).unwrap_or(u32::MAX).saturating_add(1)),
        }
    }
}

/// How `next` becomes `current` between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferStrategy {
    /// Exchange the two label handles.
    #[default]
    Swap,
    /// Device-side copy of `next` into `current`.
    CopyBack,
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Same-region predicate parameters.
    pub params: KernelParams,
    /// Round bound.
    pub iteration_limit: IterationLimit,
    /// Buffer handover between rounds.
    pub strategy: BufferStrategy,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: KernelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_iteration_limit(mut self, limit: IterationLimit) -> Self {
        self.iteration_limit = limit;
        self
    }

    pub fn with_strategy(mut self, strategy: BufferStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Result of one segmentation run.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Final labels, same shape as the input.
    pub labels: LabelGrid,
    /// Rounds executed, including the round that confirmed the fixpoint.
    pub iterations: u32,
    /// Name of the surface that produced the labels.
    pub backend: &'static str,
}

impl Segmentation {
    /// Number of distinct regions.
    pub fn regions(&self) -> usize {
        self.labels.region_count()
    }
}

/// Label propagation engine bound to one compute surface.
pub struct LabelEngine<S: ComputeSurface> {
    surface: S,
    config: EngineConfig,
}

impl<S: ComputeSurface> LabelEngine<S> {
    /// Engine with the default configuration.
    pub fn new(surface: S) -> Self {
        Self::with_config(surface, EngineConfig::default())
    }

    pub fn with_config(surface: S, config: EngineConfig) -> Self {
        Self { surface, config }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Segment `image` into same-region connected components.
    ///
    /// Each component ends up labelled with the smallest initial label
    /// (`y * width + x`) among its pixels. Device buffers live only for the
    /// duration of the call.
    ///
    /// # Errors
    ///
    /// - [`ComputeError::InvalidConfig`] for `IterationLimit::Fixed(0)`
    /// - [`ComputeError::EmptyImage`] for a zero-sized image
    /// - [`ComputeError::ImageTooLarge`] if the run does not fit the surface
    /// - [`ComputeError::Divergence`] if the iteration limit is reached
    /// - any surface error, unchanged
    pub fn run(&mut self, image: &GrayImage) -> ComputeResult<Segmentation> {
        let (width, height) = image.dimensions();
        if self.config.iteration_limit == IterationLimit::Fixed(0) {
            return Err(ComputeError::InvalidConfig(
                "iteration limit must allow at least one round".to_string(),
            ));
        }
        if image.is_empty() {
            return Err(ComputeError::EmptyImage { width, height });
        }
        self.surface.limits().check_image(width, height)?;

        let surface = &self.surface;
        let limit = self.config.iteration_limit.resolve(image.pixel_count());
        debug!(width, height, backend = surface.name(), ?limit, "label propagation start");

        let device_image = surface.upload_image(image, &self.config.params)?;
        let mut current = surface.allocate_labels(width, height)?;
        let mut next = surface.allocate_labels(width, height)?;
        let mut diff = surface.allocate_diff(width, height)?;

        surface.init_labels(&device_image, &mut current)?;

        let mut iterations = 0u32;
        loop {
            iterations += 1;

            surface.propagate(&device_image, &current, &mut next)?;
            surface.compare(&current, &next, &mut diff)?;
            let changed = surface.read_diff(&diff)?.iter().filter(|&&d| d != 0).count();
            debug!(iteration = iterations, changed, "propagation round");

            if changed == 0 {
                break;
            }

            match self.config.strategy {
                BufferStrategy::Swap => mem::swap(&mut current, &mut next),
                BufferStrategy::CopyBack => surface.copy_labels(&next, &mut current)?,
            }

            if let Some(limit) = limit {
                if iterations >= limit {
                    return Err(ComputeError::Divergence { iterations, limit });
                }
            }
        }

        let data = surface.download_labels(&next)?;
        if data.len() != image.pixel_count() {
            return Err(ComputeError::BufferSizeMismatch {
                expected: image.pixel_count(),
                actual: data.len(),
            });
        }
        let labels = LabelGrid::new(width, height, data)?;

        info!(iterations, width, height, backend = surface.name(), "label propagation converged");

        Ok(Segmentation {
            labels,
            iterations,
            backend: surface.name(),
        })
    }
}

impl<S: ComputeSurface + std::fmt::Debug> std::fmt::Debug for LabelEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelEngine")
            .field("surface", &self.surface)
            .field("config", &self.config)
            .finish()
    }
}

//! GPU context and device management.
//!
//! A [`GpuContext`] owns the adapter's device and queue. It is created
//! explicitly, handed to a surface, and releases the device when the last
//! owner drops it; there is no process-wide device.

use std::sync::Arc;

use tracing::{debug, error};
use wgpu::{DeviceDescriptor, Features, Instance};

use crate::{ComputeError, ComputeResult};

/// GPU context holding device and queue.
#[derive(Clone)]
pub struct GpuContext {
    pub(crate) device: Arc<wgpu::Device>,
    pub(crate) queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
}

impl GpuContext {
    /// Create new GPU context with default settings.
    pub fn new() -> ComputeResult<Self> {
        Self::with_power_preference(wgpu::PowerPreference::HighPerformance)
    }

    /// Create context with power preference.
    pub fn with_power_preference(power: wgpu::PowerPreference) -> ComputeResult<Self> {
        pollster::block_on(Self::new_async(power))
    }

    /// Check whether any adapter can be found.
    pub fn is_available() -> bool {
        pollster::block_on(async {
            Self::instance()
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .is_some()
        })
    }

    fn instance() -> Instance {
        Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    async fn new_async(power: wgpu::PowerPreference) -> ComputeResult<Self> {
        let adapter = Self::instance()
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| ComputeError::DeviceUnavailable("no suitable GPU adapter found".into()))?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("seg-compute"),
                    required_features: Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| ComputeError::DeviceUnavailable(e.to_string()))?;

        // Errors raised outside an error scope are logged, not panicked on
        device.on_uncaptured_error(Box::new(|e| {
            error!(error = %e, "uncaptured wgpu error");
        }));

        debug!(adapter = %adapter_info.name, backend = ?adapter_info.backend, "GPU context created");

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            limits,
        })
    }

    /// Get adapter info (GPU name, vendor, etc.)
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Get device name
    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Get backend type (Vulkan, DX12, Metal, etc.)
    pub fn backend(&self) -> wgpu::Backend {
        self.adapter_info.backend
    }

    /// Limits the device was created with.
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    ///
    /// Returns the first error raised by any device call made in `f`.
    pub(crate) fn scoped<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(oom))
    }

    /// Block until all submitted work has completed.
    pub(crate) fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("device", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish()
    }
}

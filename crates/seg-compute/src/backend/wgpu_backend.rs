//! wgpu surface implementation.
//!
//! Label kernels run as WGSL compute shaders over storage buffers. Every
//! allocation, dispatch and transfer runs inside an error scope so device
//! failures come back as [`ComputeError`] values instead of panics.

use seg_core::GrayImage;
use tracing::{debug, trace};

use super::surface::{ComputeSurface, DeviceBuffer};
use super::{DeviceLimits, ensure_same_shape};
use crate::context::GpuContext;
use crate::kernel::{BindingKind, EntryPoint, KernelInterface, KernelModule};
use crate::params::KernelParams;
use crate::shaders::WORKGROUP_DIM;
use crate::{ComputeError, ComputeResult};

// =============================================================================
// Buffer handles
// =============================================================================

/// Image samples (one `u32` per pixel) and the params uniform.
pub struct WgpuImage {
    pixels: wgpu::Buffer,
    params: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl DeviceBuffer for WgpuImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Label grid storage buffer.
pub struct WgpuLabels {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl DeviceBuffer for WgpuLabels {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Difference buffer with its own staging buffer and dims uniform.
pub struct WgpuDiff {
    buffer: wgpu::Buffer,
    staging: wgpu::Buffer,
    params: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl DeviceBuffer for WgpuDiff {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// =============================================================================
// Pipelines
// =============================================================================

struct KernelPipeline {
    entry: EntryPoint,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

struct Pipelines {
    init: KernelPipeline,
    propagate: KernelPipeline,
    compare: KernelPipeline,
}

fn layout_entry(slot: u32, kind: BindingKind) -> wgpu::BindGroupLayoutEntry {
    let ty = match kind {
        BindingKind::StorageRead => wgpu::BufferBindingType::Storage { read_only: true },
        BindingKind::StorageReadWrite => wgpu::BufferBindingType::Storage { read_only: false },
        BindingKind::Uniform => wgpu::BufferBindingType::Uniform,
    };
    wgpu::BindGroupLayoutEntry {
        binding: slot,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

// =============================================================================
// WgpuSurface
// =============================================================================

/// wgpu compute surface.
pub struct WgpuSurface {
    context: GpuContext,
    pipelines: Pipelines,
    limits: DeviceLimits,
}

impl WgpuSurface {
    /// Check if wgpu is available.
    pub fn is_available() -> bool {
        GpuContext::is_available()
    }

    /// Surface on the default adapter with the bundled kernels.
    pub fn new() -> ComputeResult<Self> {
        Self::with_kernel(GpuContext::new()?, &KernelModule::builtin())
    }

    /// Surface on `context` running `module`.
    ///
    /// The module is validated against [`KernelInterface::v1`], compiled,
    /// and bound into one pipeline per entry point before this returns.
    ///
    /// # Errors
    ///
    /// [`ComputeError::KernelContract`] or [`ComputeError::KernelCompile`].
    pub fn with_kernel(context: GpuContext, module: &KernelModule) -> ComputeResult<Self> {
        let interface = KernelInterface::v1();
        module.validate(&interface)?;

        let pipelines = Self::create_pipelines(&context, module, &interface)?;

        let adapter_limits = context.limits();
        let limits = DeviceLimits {
            max_grid_dim: adapter_limits
                .max_compute_workgroups_per_dimension
                .saturating_mul(WORKGROUP_DIM),
            max_buffer_bytes: adapter_limits
                .max_buffer_size
                .min(adapter_limits.max_storage_buffer_binding_size as u64),
            available_memory: estimate_vram(context.adapter_info(), adapter_limits.max_buffer_size),
        };

        debug!(
            device = context.device_name(),
            module = module.name(),
            max_buffer_bytes = limits.max_buffer_bytes,
            "wgpu surface ready"
        );

        Ok(Self {
            context,
            pipelines,
            limits,
        })
    }

    /// The context this surface runs on.
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    fn create_pipelines(
        context: &GpuContext,
        module: &KernelModule,
        interface: &KernelInterface,
    ) -> ComputeResult<Pipelines> {
        let device = &context.device;

        let (shader, error) = context.scoped(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(module.name()),
                source: wgpu::ShaderSource::Wgsl(module.source().into()),
            })
        });
        let info = pollster::block_on(shader.get_compilation_info());
        let diagnostics: Vec<String> = info
            .messages
            .iter()
            .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
            .map(|m| match &m.location {
                Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
                None => m.message.clone(),
            })
            .collect();
        if !diagnostics.is_empty() {
            return Err(ComputeError::KernelCompile(diagnostics.join("\n")));
        }
        if let Some(e) = error {
            return Err(ComputeError::KernelCompile(e.to_string()));
        }

        let create_pipeline = |entry: &EntryPoint| -> ComputeResult<KernelPipeline> {
            let entries: Vec<_> = entry
                .bindings
                .iter()
                .map(|b| layout_entry(b.slot, b.kind))
                .collect();

            let ((pipeline, layout), error) = context.scoped(|| {
                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(entry.name),
                    entries: &entries,
                });
                let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(entry.name),
                    bind_group_layouts: &[&layout],
                    push_constant_ranges: &[],
                });
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry.name),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some(entry.name),
                    compilation_options: Default::default(),
                    cache: None,
                });
                (pipeline, layout)
            });

            if let Some(e) = error {
                return Err(ComputeError::KernelContract {
                    entry_point: entry.name.into(),
                    reason: e.to_string(),
                });
            }
            Ok(KernelPipeline {
                entry: *entry,
                pipeline,
                layout,
            })
        };

        Ok(Pipelines {
            init: create_pipeline(&interface.init_labels)?,
            propagate: create_pipeline(&interface.propagate)?,
            compare: create_pipeline(&interface.compare)?,
        })
    }

    fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> ComputeResult<wgpu::Buffer> {
        let (buffer, error) = self.context.scoped(|| {
            self.context.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        });
        match error {
            Some(e) => Err(ComputeError::Transfer {
                op: "allocate",
                reason: e.to_string(),
            }),
            None => Ok(buffer),
        }
    }

    fn create_params(&self, params: &KernelParams, width: u32, height: u32) -> ComputeResult<wgpu::Buffer> {
        let uniform = params.to_uniform(width, height);
        let buffer = self.create_buffer(
            "params_uniform",
            std::mem::size_of_val(&uniform) as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;
        self.write(&buffer, bytemuck::bytes_of(&uniform))?;
        Ok(buffer)
    }

    /// Queue a host to device write.
    fn write(&self, buffer: &wgpu::Buffer, data: &[u8]) -> ComputeResult<()> {
        let ((), error) = self.context.scoped(|| self.context.queue.write_buffer(buffer, 0, data));
        match error {
            Some(e) => Err(ComputeError::Transfer {
                op: "upload",
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Bind `resources` by role to the kernel's slots and queue one dispatch
    /// covering a `width x height` grid.
    fn dispatch(
        &self,
        kernel: &KernelPipeline,
        resources: &[(&'static str, &wgpu::Buffer)],
        width: u32,
        height: u32,
    ) -> ComputeResult<()> {
        let name = kernel.entry.name;
        let mut entries = Vec::with_capacity(kernel.entry.bindings.len());
        for binding in kernel.entry.bindings {
            let (_, buffer) = resources
                .iter()
                .find(|(role, _)| *role == binding.role)
                .ok_or_else(|| ComputeError::Dispatch {
                    kernel: name,
                    reason: format!("no buffer for binding {} ({})", binding.slot, binding.role),
                })?;
            entries.push(wgpu::BindGroupEntry {
                binding: binding.slot,
                resource: buffer.as_entire_binding(),
            });
        }

        let device = &self.context.device;
        let ((), error) = self.context.scoped(|| {
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(name),
                layout: &kernel.layout,
                entries: &entries,
            });

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(name),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(name),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&kernel.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(width.div_ceil(WORKGROUP_DIM), height.div_ceil(WORKGROUP_DIM), 1);
            }
            self.context.queue.submit(std::iter::once(encoder.finish()));
        });

        trace!(kernel = name, width, height, "dispatched");
        match error {
            Some(e) => Err(ComputeError::Dispatch {
                kernel: name,
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Copy `src` into `staging`, wait for the queue and read it back.
    fn read_back(&self, op: &'static str, src: &wgpu::Buffer, staging: &wgpu::Buffer, size: u64) -> ComputeResult<Vec<u32>> {
        let transfer = |reason: String| ComputeError::Transfer { op, reason };

        let ((), error) = self.context.scoped(|| {
            let mut encoder = self.context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(op),
            });
            encoder.copy_buffer_to_buffer(src, 0, staging, 0, size);
            self.context.queue.submit(std::iter::once(encoder.finish()));
        });
        if let Some(e) = error {
            return Err(transfer(e.to_string()));
        }

        let slice = staging.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.context.wait_idle();

        rx.recv()
            .map_err(|_| transfer("map channel closed".into()))?
            .map_err(|e| transfer(format!("map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<u32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(result)
    }
}

impl ComputeSurface for WgpuSurface {
    type Image = WgpuImage;
    type Labels = WgpuLabels;
    type Diff = WgpuDiff;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    fn upload_image(&self, image: &GrayImage, params: &KernelParams) -> ComputeResult<Self::Image> {
        let (width, height) = image.dimensions();
        self.limits.check_image(width, height)?;

        let samples: Vec<u32> = image.as_slice().iter().map(|&v| v as u32).collect();
        let pixels = self.create_buffer(
            "pixels",
            (samples.len() * 4) as u64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        )?;
        self.write(&pixels, bytemuck::cast_slice(&samples))?;
        let params = self.create_params(params, width, height)?;

        Ok(WgpuImage {
            pixels,
            params,
            width,
            height,
        })
    }

    fn allocate_labels(&self, width: u32, height: u32) -> ComputeResult<Self::Labels> {
        let buffer = self.create_buffer(
            "labels",
            width as u64 * height as u64 * 4,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        )?;
        Ok(WgpuLabels { buffer, width, height })
    }

    fn allocate_diff(&self, width: u32, height: u32) -> ComputeResult<Self::Diff> {
        let size = width as u64 * height as u64 * 4;
        let buffer = self.create_buffer("diff", size, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)?;
        let staging = self.create_buffer(
            "diff_staging",
            size,
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        )?;
        let params = self.create_params(&KernelParams::default(), width, height)?;
        Ok(WgpuDiff {
            buffer,
            staging,
            params,
            width,
            height,
        })
    }

    fn init_labels(&self, image: &Self::Image, out: &mut Self::Labels) -> ComputeResult<()> {
        ensure_same_shape(image, out)?;
        self.dispatch(
            &self.pipelines.init,
            &[
                ("pixels", &image.pixels),
                ("labels_out", &out.buffer),
                ("params", &image.params),
            ],
            image.width,
            image.height,
        )
    }

    fn propagate(&self, image: &Self::Image, src: &Self::Labels, dst: &mut Self::Labels) -> ComputeResult<()> {
        ensure_same_shape(image, src)?;
        ensure_same_shape(image, dst)?;
        self.dispatch(
            &self.pipelines.propagate,
            &[
                ("pixels", &image.pixels),
                ("labels_in", &src.buffer),
                ("labels_out", &dst.buffer),
                ("params", &image.params),
            ],
            image.width,
            image.height,
        )
    }

    fn compare(&self, a: &Self::Labels, b: &Self::Labels, diff: &mut Self::Diff) -> ComputeResult<()> {
        ensure_same_shape(a, b)?;
        ensure_same_shape(a, diff)?;
        self.dispatch(
            &self.pipelines.compare,
            &[
                ("labels_in", &a.buffer),
                ("labels_out", &b.buffer),
                ("diff", &diff.buffer),
                ("params", &diff.params),
            ],
            diff.width,
            diff.height,
        )
    }

    fn copy_labels(&self, src: &Self::Labels, dst: &mut Self::Labels) -> ComputeResult<()> {
        ensure_same_shape(src, dst)?;
        let ((), error) = self.context.scoped(|| {
            let mut encoder = self.context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("copy_labels"),
            });
            encoder.copy_buffer_to_buffer(&src.buffer, 0, &dst.buffer, 0, src.size_bytes());
            self.context.queue.submit(std::iter::once(encoder.finish()));
        });
        match error {
            Some(e) => Err(ComputeError::Transfer {
                op: "copy_labels",
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn read_diff(&self, diff: &Self::Diff) -> ComputeResult<Vec<u32>> {
        self.read_back("read_diff", &diff.buffer, &diff.staging, diff.size_bytes())
    }

    fn download_labels(&self, labels: &Self::Labels) -> ComputeResult<Vec<u32>> {
        let staging = self.create_buffer(
            "labels_staging",
            labels.size_bytes(),
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        )?;
        self.read_back("download_labels", &labels.buffer, &staging, labels.size_bytes())
    }
}

// =============================================================================
// VRAM Detection
// =============================================================================

fn estimate_vram(info: &wgpu::AdapterInfo, max_buffer_bytes: u64) -> u64 {
    // Check env override
    if let Ok(mb) = std::env::var("SEG_GPU_MEMORY_MB") {
        if let Ok(mb) = mb.parse::<u64>() {
            return mb.saturating_mul(1024 * 1024);
        }
    }

    let from_buffer = max_buffer_bytes.saturating_mul(2);

    let estimated = match info.device_type {
        wgpu::DeviceType::DiscreteGpu => from_buffer.clamp(2u64 << 30, 24u64 << 30),
        wgpu::DeviceType::IntegratedGpu => from_buffer.clamp(512u64 << 20, 4u64 << 30),
        wgpu::DeviceType::VirtualGpu => from_buffer.clamp(1u64 << 30, 8u64 << 30),
        _ => from_buffer.clamp(256u64 << 20, 2u64 << 30),
    };

    // 80% safe margin
    estimated.saturating_mul(80) / 100
}

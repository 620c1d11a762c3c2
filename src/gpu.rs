//! GPU backend: the escape-time kernel as a `wgpu` compute pipeline.
//!
//! Construction walks through instance (platform), adapter (device), logical
//! device and queue (context), and pipeline (compiled kernel) once; any failing
//! step is reported as [`Error::DeviceUnavailable`] and no engine is built.
//!
//! The kernel works in `f32`, so results agree with the CPU engine only up to
//! floating-point tolerance near the boundary of the set.

use bytemuck::{Pod, Zeroable};
use log::{debug, info, trace};

use crate::{
    colour::Palette,
    compute,
    encoder::{self, CommandEncoderExt},
    engine::{ComputeEngine, ComputeParams, IterationBudget},
    error::{Error, Result},
    raster::Raster,
    screen,
    typed_buffer::{self, Buffer, Uniform},
    viewport::Viewport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuOptions {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

/// Uniform parameters of `mandelbrot.wgsl#mandelbrot`, in binding order.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, Default, PartialEq)]
struct KernelParams {
    image_width: u32,
    image_height: u32,
    min_x: f32,
    min_y: f32,
    scale_x: f32,
    scale_y: f32,
    max_iterations: u32,
    palette_length: u32,
}

impl KernelParams {
    fn new(params: &ComputeParams, max_iterations: u32, palette_length: u32) -> Self {
        Self {
            image_width: params.image_width,
            image_height: params.image_height,
            min_x: params.min_x as f32,
            min_y: params.min_y as f32,
            scale_x: params.scale_x as f32,
            scale_y: params.scale_y as f32,
            max_iterations,
            palette_length,
        }
    }
}

/// Buffers sized for one raster size. Rebuilt whenever the size changes.
struct OutputSet {
    size: screen::Size,
    pixels: Buffer<u32>,
    readback: Buffer<u32>,
    bind_group: wgpu::BindGroup,
}

impl Drop for OutputSet {
    fn drop(&mut self) {
        debug!(
            "releasing {}x{} output buffers",
            self.size.width, self.size.height
        );
        self.pixels.buffer().destroy();
        self.readback.buffer().destroy();
    }
}

pub struct GpuEngine {
    output: Option<OutputSet>,
    params: Uniform<KernelParams>,
    palette_buffer: Buffer<u32>,
    palette: Palette,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    queue: wgpu::Queue,
    device: wgpu::Device,
    adapter_name: String,
}

impl GpuEngine {
    pub fn new(palette: Palette, options: GpuOptions) -> Result<Self> {
        pollster::block_on(Self::new_async(palette, options))
    }

    async fn new_async(palette: Palette, options: GpuOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(options.backends);
        debug!("gpu engine: platform selected ({:?})", options.backends);

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                force_fallback_adapter: options.force_fallback_adapter,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| Error::DeviceUnavailable("no compatible adapter".to_string()))?;
        let adapter_info = adapter.get_info();
        debug!(
            "gpu engine: device selected ({} on {:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("mandelbrot-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|error| Error::DeviceUnavailable(error.to_string()))?;
        debug!("gpu engine: context ready");

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mandelbrot-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mandelbrot.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mandelbrot-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Uniform::<KernelParams>::min_binding_size(),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mandelbrot-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("mandelbrot-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: "mandelbrot",
        });

        if let Some(error) = device.pop_error_scope().await {
            return Err(Error::DeviceUnavailable(format!(
                "mandelbrot kernel failed to compile: {error}"
            )));
        }
        debug!("gpu engine: kernel compiled");

        let palette_buffer = typed_buffer::Builder::from(palette.colours())
            .with_label("mandelbrot-palette")
            .with_usage(wgpu::BufferUsages::STORAGE)
            .create(&device);

        let params = Uniform::new(&device, "mandelbrot-params", KernelParams::default());

        info!(
            "gpu engine ready on {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        Ok(Self {
            output: None,
            params,
            palette_buffer,
            palette,
            pipeline,
            bind_group_layout,
            queue,
            device,
            adapter_name: adapter_info.name,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn allocate_output(&self, size: screen::Size) -> Result<OutputSet> {
        let limits = self.device.limits();
        let byte_size = size.pixel_count() as u64 * std::mem::size_of::<u32>() as u64;
        if byte_size > limits.max_storage_buffer_binding_size as u64 {
            return Err(Error::ResourceExhaustion(format!(
                "{}x{} output needs {} bytes, the device allows {}",
                size.width, size.height, byte_size, limits.max_storage_buffer_binding_size
            )));
        }

        let (x, y, _) = compute::mandelbrot_dispatch_size(size);
        if x.max(y) > limits.max_compute_workgroups_per_dimension {
            return Err(Error::ResourceExhaustion(format!(
                "{}x{} output needs {} workgroups per dimension, the device allows {}",
                size.width,
                size.height,
                x.max(y),
                limits.max_compute_workgroups_per_dimension
            )));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let pixels = typed_buffer::Builder::new(size.pixel_count() as u64)
            .with_label("mandelbrot-pixels")
            .with_usage(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)
            .create(&self.device);

        let readback = typed_buffer::Builder::new(size.pixel_count() as u64)
            .with_label("mandelbrot-readback")
            .with_usage(wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST)
            .create(&self.device);

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::ResourceExhaustion(error.to_string()));
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mandelbrot-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: pixels.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.palette_buffer.binding_resource(),
                },
            ],
        });

        debug!("allocated {}x{} output buffers", size.width, size.height);

        Ok(OutputSet {
            size,
            pixels,
            readback,
            bind_group,
        })
    }

    /// Runs the kernel into the output set and waits for it.
    fn dispatch(&self, output: &OutputSet) -> Result<()> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let command_buffer = encoder::record(&self.device, "mandelbrot-commands", |encoder| {
            encoder.with_compute_pass("mandelbrot-pass", |compute_pass| {
                compute_pass.set_pipeline(&self.pipeline);
                compute_pass.set_bind_group(0, &output.bind_group, &[]);
                compute_pass.insert_debug_marker("mandelbrot");
                let (x, y, z) = compute::mandelbrot_dispatch_size(output.size);
                compute_pass.dispatch_workgroups(x, y, z);
            });
            typed_buffer::copy_buffer_to_buffer(encoder, &output.pixels, &output.readback);
        });
        self.queue.submit([command_buffer]);

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(Error::Dispatch(error.to_string())),
            None => Ok(()),
        }
    }
}

impl ComputeEngine for GpuEngine {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn palette(&self) -> &Palette {
        &self.palette
    }

    fn compute(
        &mut self,
        raster: &mut Raster,
        viewport: &Viewport,
        budget: IterationBudget,
    ) -> Result<()> {
        trace!("begin gpu compute");

        let size = raster.size();
        let output = match self.output.take() {
            Some(output) if output.size == size => output,
            stale => {
                drop(stale);
                self.allocate_output(size)?
            }
        };

        let params = ComputeParams::new(viewport, size.width, size.height);
        self.params.write(
            &self.queue,
            KernelParams::new(&params, budget.get(), self.palette.len() as u32),
        );

        let result = self.dispatch(&output).and_then(|()| {
            output
                .readback
                .read_into(&self.device, raster.pixels_mut())
                .map_err(Error::from)
        });
        self.output = Some(output);
        result?;

        trace!("end gpu compute");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_params_match_the_wgsl_layout() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 32);
    }

    #[test]
    fn kernel_params_narrow_compute_params() {
        let viewport = Viewport::from_bounds(-2.0, 0.6, -1.3, 1.3).unwrap();
        let params = ComputeParams::new(&viewport, 100, 50);
        let kernel_params = KernelParams::new(&params, 512, 640);

        assert_eq!(kernel_params.image_width, 100);
        assert_eq!(kernel_params.image_height, 50);
        assert!((kernel_params.min_x - -2.0).abs() < 1e-6);
        assert!((kernel_params.min_y - -1.3).abs() < 1e-6);
        assert!((kernel_params.scale_x - 0.026).abs() < 1e-7);
        assert!((kernel_params.scale_y - 0.052).abs() < 1e-7);
        assert_eq!(kernel_params.max_iterations, 512);
        assert_eq!(kernel_params.palette_length, 640);
    }
}

//! Shows rasters in a window.
//!
//! The raster is copied into a `Bgra8Unorm` texture, which reads packed
//! `0x00RRGGBB` little-endian pixels as-is, and drawn with a full-window quad.

use std::num::NonZeroU32;

use log::{debug, warn};

use crate::{
    encoder::{self, CommandEncoderExt},
    error::{Error, Result},
    raster::Raster,
    screen,
};

struct Frame {
    size: screen::Size,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

pub struct Presenter {
    frame: Frame,
    render_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    surface_configuration: wgpu::SurfaceConfiguration,
    surface: wgpu::Surface,
    queue: wgpu::Queue,
    device: wgpu::Device,
}

impl Presenter {
    pub fn new(window: &winit::window::Window) -> Result<Self> {
        let size = screen::Size::from(window.inner_size());

        let instance = wgpu::Instance::new(
            wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all),
        );
        // SAFETY: the window outlives the presenter; both are owned by the event loop.
        let surface = unsafe { instance.create_surface(window) };

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: Default::default(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        }))
        .ok_or_else(|| {
            Error::DeviceUnavailable("no adapter can present to the window".to_string())
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("present-device"),
                features: wgpu::Features::empty(),
                limits: wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
            },
            None,
        ))
        .map_err(|error| Error::DeviceUnavailable(error.to_string()))?;

        let formats = surface.get_supported_formats(&adapter);
        let format = formats
            .iter()
            .copied()
            .find(|format| !format.describe().srgb)
            .or_else(|| formats.first().copied())
            .ok_or_else(|| {
                Error::DeviceUnavailable("surface is incompatible with the adapter".to_string())
            })?;

        let surface_configuration = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
        };
        surface.configure(&device, &surface_configuration);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("present-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("present.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("present-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("present-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("present-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vertex_main",
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fragment_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let frame = create_frame(
            &device,
            &bind_group_layout,
            screen::Size::new(surface_configuration.width, surface_configuration.height),
        );

        Ok(Self {
            frame,
            render_pipeline,
            bind_group_layout,
            surface_configuration,
            surface,
            queue,
            device,
        })
    }

    /// Reconfigures the surface. Minimised windows report an empty size and are
    /// skipped.
    pub fn resize(&mut self, size: screen::Size) {
        if size.is_empty() {
            return;
        }

        debug!("resizing surface to {}x{}", size.width, size.height);
        self.surface_configuration.width = size.width;
        self.surface_configuration.height = size.height;
        self.surface.configure(&self.device, &self.surface_configuration);
    }

    /// Copies a freshly computed raster into the frame texture.
    pub fn upload(&mut self, raster: &Raster) {
        if self.frame.size != raster.size() {
            self.frame = create_frame(&self.device, &self.bind_group_layout, raster.size());
        }

        let size = raster.size();
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.frame.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            raster.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: NonZeroU32::new(4 * size.width),
                rows_per_image: NonZeroU32::new(size.height),
            },
            extent(size),
        );
    }

    pub fn render(&mut self) -> Result<()> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.surface_configuration);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out waiting for the surface");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(Error::ResourceExhaustion(
                    "out of memory acquiring the surface".to_string(),
                ))
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let command_buffer = encoder::record(&self.device, "present-commands", |encoder| {
            encoder.with_render_pass(
                &wgpu::RenderPassDescriptor {
                    label: Some("present-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &surface_texture_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: true,
                        },
                    })],
                    depth_stencil_attachment: None,
                },
                |render_pass| {
                    render_pass.set_pipeline(&self.render_pipeline);
                    render_pass.set_bind_group(0, &self.frame.bind_group, &[]);
                    render_pass.draw(0..4, 0..1);
                },
            );
        });

        self.queue.submit([command_buffer]);
        surface_texture.present();
        Ok(())
    }
}

fn extent(size: screen::Size) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

fn create_frame(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    size: screen::Size,
) -> Frame {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("frame-texture"),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Bgra8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    });

    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame-bind-group"),
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(&texture_view),
        }],
    });

    Frame {
        size,
        texture,
        bind_group,
    }
}

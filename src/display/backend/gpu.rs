// GPU render backend - wgpu renderer on a winit window
//
// Creating the backend creates the output window and the renderer. Every
// texture is BGRA8 (the byte order of packed ARGB on little-endian hosts) and
// carries a bind group with the sampler matching its filter mode, so a copy is
// a single fullscreen-triangle draw into the current target.
//
// Passes are recorded into one command encoder per frame and submitted by
// `present`; queued texture uploads are applied before that submission.

use super::{FilterMode, RenderBackend, TextureAccess, TextureDesc};
use crate::display::upscale::{Resolution, TextureLimits};
use crate::error::BackendError;
use std::sync::Arc;
use winit::dpi::LogicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Fullscreen, Window};

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

const BLIT_WGSL: &str = include_str!("blit.wgsl");

/// Output window parameters
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    /// Initial inner size in logical (DPI-independent) pixels
    pub size: Resolution,
    pub fullscreen: bool,
    pub vsync: bool,
}

/// Texture owned by a `GpuBackend`
pub struct GpuTexture {
    id: u32,
    desc: TextureDesc,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl GpuTexture {
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }
}

enum RenderTarget {
    Surface,
    Texture { id: u32, view: wgpu::TextureView },
}

/// wgpu renderer presenting to a winit window
pub struct GpuBackend {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter_info: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    output_size: Resolution,
    limits: TextureLimits,

    bind_group_layout: wgpu::BindGroupLayout,
    texture_pipeline: wgpu::RenderPipeline,
    surface_pipeline: wgpu::RenderPipeline,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,

    target: RenderTarget,
    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<wgpu::SurfaceTexture>,
    frame_view: Option<wgpu::TextureView>,
    next_texture_id: u32,
}

impl GpuBackend {
    /// Create the output window and the renderer
    ///
    /// # Errors
    /// Fails if the window, surface, adapter or device cannot be created.
    pub fn new(event_loop: &ActiveEventLoop, options: &WindowOptions) -> Result<Self, BackendError> {
        let mut attributes = Window::default_attributes()
            .with_title(options.title.clone())
            .with_inner_size(LogicalSize::new(options.size.width, options.size.height))
            .with_resizable(true);
        if options.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = event_loop
            .create_window(attributes)
            .map_err(|e| BackendError::Window(e.to_string()))?;
        let window = Arc::new(window);
        window.set_cursor_visible(false);

        let inner = window.inner_size();
        let output_size = Resolution::new(inner.width, inner.height);

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| BackendError::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        }))
        .map_err(|e| BackendError::Adapter(e.to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("crt-pipeline device"),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|e| BackendError::Device(e.to_string()))?;

        let max_dimension = device.limits().max_texture_dimension_2d;
        let limits = TextureLimits::new(max_dimension, max_dimension);

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| BackendError::Surface("surface reports no formats".to_string()))?;
        if format.is_srgb() {
            log::warn!("Only sRGB surface formats available; colors will be gamma encoded");
        }
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: output_size.width.max(1),
            height: output_size.height.max(1),
            present_mode: if options.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("crt-pipeline blit bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("crt-pipeline blit shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_WGSL.into()),
        });

        let texture_pipeline = create_blit_pipeline(
            &device,
            &bind_group_layout,
            &shader,
            TEXTURE_FORMAT,
            "crt-pipeline texture blit",
        );
        let surface_pipeline = create_blit_pipeline(
            &device,
            &bind_group_layout,
            &shader,
            format,
            "crt-pipeline surface blit",
        );

        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("crt-pipeline nearest sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("crt-pipeline linear sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            window,
            surface,
            adapter_info: adapter.get_info(),
            device,
            queue,
            config,
            output_size,
            limits,
            bind_group_layout,
            texture_pipeline,
            surface_pipeline,
            nearest_sampler,
            linear_sampler,
            target: RenderTarget::Surface,
            encoder: None,
            frame: None,
            frame_view: None,
            next_texture_id: 0,
        })
    }

    /// The output window
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Acquire the next surface frame if the surface is the target and none is held
    fn acquire_frame(&mut self) -> Result<(), BackendError> {
        if self.frame.is_some() || !matches!(self.target, RenderTarget::Surface) {
            return Ok(());
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(|e| BackendError::Surface(e.to_string()))?
            }
            Err(e) => return Err(BackendError::Surface(e.to_string())),
        };

        self.frame_view = Some(
            frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
        );
        self.frame = Some(frame);
        Ok(())
    }

    /// Record one render pass on the current target
    ///
    /// Without a source the pass only clears the target.
    fn record_pass(&mut self, source: Option<&GpuTexture>) -> Result<(), BackendError> {
        self.acquire_frame()?;

        let (view, pipeline) = match &self.target {
            RenderTarget::Surface => (
                self.frame_view
                    .as_ref()
                    .ok_or_else(|| BackendError::Surface("no frame acquired".to_string()))?,
                &self.surface_pipeline,
            ),
            RenderTarget::Texture { view, .. } => (view, &self.texture_pipeline),
        };

        let device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("crt-pipeline frame encoder"),
            })
        });

        let load = match source {
            Some(_) => wgpu::LoadOp::Load,
            None => wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("crt-pipeline blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(source) = source {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &source.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        Ok(())
    }
}

impl RenderBackend for GpuBackend {
    type Texture = GpuTexture;

    fn name(&self) -> String {
        format!("wgpu/{:?} ({})", self.adapter_info.backend, self.adapter_info.name)
    }

    fn output_size(&self) -> Resolution {
        self.output_size
    }

    fn max_texture_size(&self) -> TextureLimits {
        self.limits
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<GpuTexture, BackendError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::Texture(format!(
                "texture '{}' has a zero dimension",
                desc.label
            )));
        }
        if !self.limits.fits(desc.size()) {
            return Err(BackendError::TextureTooLarge {
                label: desc.label,
                width: desc.width,
                height: desc.height,
                max_width: self.limits.max_width,
                max_height: self.limits.max_height,
            });
        }

        let usage = match desc.access {
            TextureAccess::Streaming => {
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
            }
            TextureAccess::RenderTarget => {
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT
            }
        };

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = match desc.filter {
            FilterMode::Nearest => &self.nearest_sampler,
            FilterMode::Linear => &self.linear_sampler,
        };
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            texture.destroy();
            return Err(BackendError::Texture(format!("'{}': {}", desc.label, err)));
        }

        let id = self.next_texture_id;
        self.next_texture_id += 1;
        Ok(GpuTexture {
            id,
            desc: *desc,
            texture,
            bind_group,
        })
    }

    fn destroy_texture(&mut self, texture: GpuTexture) {
        if matches!(self.target, RenderTarget::Texture { id, .. } if id == texture.id) {
            self.target = RenderTarget::Surface;
        }
        texture.texture.destroy();
    }

    fn update_texture(
        &mut self,
        texture: &GpuTexture,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<(), BackendError> {
        if texture.desc.access != TextureAccess::Streaming {
            return Err(BackendError::Texture(format!(
                "texture '{}' is not a streaming texture",
                texture.desc.label
            )));
        }

        let row_bytes = texture.desc.width as usize * 4;
        let expected = pitch * (texture.desc.height as usize - 1) + row_bytes;
        if pitch < row_bytes || pixels.len() < expected {
            return Err(BackendError::ShortUpload {
                expected,
                actual: pixels.len(),
            });
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels[..expected],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(pitch as u32),
                rows_per_image: Some(texture.desc.height),
            },
            wgpu::Extent3d {
                width: texture.desc.width,
                height: texture.desc.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn set_render_target(&mut self, target: Option<&GpuTexture>) -> Result<(), BackendError> {
        self.target = match target {
            None => RenderTarget::Surface,
            Some(texture) => {
                if texture.desc.access != TextureAccess::RenderTarget {
                    return Err(BackendError::Texture(format!(
                        "texture '{}' is not a render target",
                        texture.desc.label
                    )));
                }
                RenderTarget::Texture {
                    id: texture.id,
                    view: texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default()),
                }
            }
        };
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        self.record_pass(None)
    }

    fn copy(&mut self, source: &GpuTexture) -> Result<(), BackendError> {
        if matches!(self.target, RenderTarget::Texture { id, .. } if id == source.id) {
            return Err(BackendError::SelfCopy(source.id));
        }
        self.record_pass(Some(source))
    }

    fn present(&mut self) -> Result<(), BackendError> {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
        self.frame_view = None;
        if let Some(frame) = self.frame.take() {
            self.window.pre_present_notify();
            frame.present();
        }
        Ok(())
    }

    fn resize_output(&mut self, size: Resolution) -> Result<(), BackendError> {
        self.output_size = size;
        // A minimized window reports 0x0; the surface keeps its last configuration
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(&self.device, &self.config);
        }
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), BackendError> {
        let mode = fullscreen.then_some(Fullscreen::Borderless(None));
        self.window.set_fullscreen(mode);
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.window.fullscreen().is_some()
    }
}

fn create_blit_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

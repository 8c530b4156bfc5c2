// wgpu backend: surface, pipelines and the two-pass composite.
//
// Layout:
//   - one MSAA colour target + one MSAA depth target, resolved into the
//     swapchain texture at the end of every pass
//   - three pipelines: plane, tube (both read MaterialUniforms) and basic
//   - one vertex/index buffer pair per scene entity, uploaded once

use std::collections::HashMap;
use std::sync::Arc;

use bevy_ecs::prelude::Entity;
use log::{info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::components::{Geometry, Material};
use super::debug_overlay::DebugOverlay;
use super::experience::MAX_PIXEL_RATIO;
use super::mesh::{GpuVertex, TubeVertex};
use super::renderer::{
    BasicUniforms, ColorLoad, FrameContext, MaterialUniforms, RenderError, Renderer, SceneLayer,
};
use super::scene::Scenes;

const SAMPLE_COUNT: u32 = 4;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// GPU RESOURCES
// ============================================================================

struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, contents: &[u8], label: &str) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    material: Material,
    /// Present only for `Material::Basic`; refreshed every frame with the model matrix.
    basic: Option<UniformSlot>,
}

struct RenderTargets {
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
}

impl RenderTargets {
    fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };
        let make = |label: &str, format: wgpu::TextureFormat| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size,
                    mip_level_count: 1,
                    sample_count: SAMPLE_COUNT,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };
        Self {
            color: make("MSAA Color Target", config.format),
            depth: make("Depth Target", DEPTH_FORMAT),
        }
    }
}

// ============================================================================
// RENDERER
// ============================================================================

pub struct GpuRenderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    targets: RenderTargets,

    plane_pipeline: wgpu::RenderPipeline,
    tube_pipeline: wgpu::RenderPipeline,
    basic_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    plane_uniforms: UniformSlot,
    tube_uniforms: UniformSlot,

    meshes: HashMap<Entity, GpuMesh>,
    overlay: DebugOverlay,
}

impl GpuRenderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!("using adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let targets = RenderTargets::new(&device, &config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("uniform_bind_group_layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let plane_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            config.format,
            "Plane Pipeline",
            include_str!("shaders/plane.wgsl"),
            GpuVertex::desc(),
        );
        let tube_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            config.format,
            "Tube Pipeline",
            include_str!("shaders/tube.wgsl"),
            TubeVertex::desc(),
        );
        let basic_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            config.format,
            "Basic Pipeline",
            include_str!("shaders/basic.wgsl"),
            GpuVertex::desc(),
        );

        let initial = MaterialUniforms::new();
        let plane_uniforms =
            UniformSlot::new(&device, &uniform_layout, bytemuck::bytes_of(&initial), "Plane Uniforms");
        let tube_uniforms =
            UniformSlot::new(&device, &uniform_layout, bytemuck::bytes_of(&initial), "Tube Uniforms");

        let overlay = DebugOverlay::new(&window, &device, config.format);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            targets,
            plane_pipeline,
            tube_pipeline,
            basic_pipeline,
            uniform_layout,
            plane_uniforms,
            tube_uniforms,
            meshes: HashMap::new(),
            overlay,
        })
    }

    pub fn toggle_overlay(&mut self) {
        self.overlay.toggle();
    }

    /// Forward a window event to the overlay while it is shown. Returns true if
    /// egui consumed it.
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        self.overlay.visible && self.overlay.handle_window_event(&self.window, event).consumed
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.targets = RenderTargets::new(&self.device, &self.config);
    }

    fn upload_scene(&mut self, scene: &super::scene::Scene) {
        for r in scene.renderables() {
            let (vertex_bytes, index_bytes) = match r.geometry {
                Geometry::Surface(mesh) => (mesh.vertex_bytes(), mesh.index_bytes()),
                Geometry::Tube(mesh) => (mesh.vertex_bytes(), mesh.index_bytes()),
            };

            let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: vertex_bytes,
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: index_bytes,
                usage: wgpu::BufferUsages::INDEX,
            });

            let basic = match r.material {
                Material::Basic { color } => {
                    let uniforms = BasicUniforms {
                        view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
                        model: r.model.to_cols_array_2d(),
                        color,
                    };
                    Some(UniformSlot::new(
                        &self.device,
                        &self.uniform_layout,
                        bytemuck::bytes_of(&uniforms),
                        "Basic Uniforms",
                    ))
                }
                _ => None,
            };

            self.meshes.insert(r.entity, GpuMesh {
                vertex_buffer,
                index_buffer,
                num_indices: r.geometry.index_count() as u32,
                material: r.material,
                basic,
            });
        }
    }
}

impl Renderer for GpuRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn upload(&mut self, scenes: &Scenes) {
        self.meshes.clear();
        self.upload_scene(&scenes.backdrop);
        self.upload_scene(&scenes.foreground);
        info!("uploaded {} meshes", self.meshes.len());
    }

    fn render(&mut self, frame: &FrameContext<'_>) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(e) => {
                warn!("skipping frame: {e}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // All buffer writes land before the passes execute.
        self.queue.write_buffer(&self.plane_uniforms.buffer, 0, bytemuck::bytes_of(frame.plane_uniforms));
        self.queue.write_buffer(&self.tube_uniforms.buffer, 0, bytemuck::bytes_of(frame.tube_uniforms));

        let view_proj = frame.view_proj.to_cols_array_2d();
        for scene in [&frame.scenes.backdrop, &frame.scenes.foreground] {
            for r in scene.renderables() {
                let Some(mesh) = self.meshes.get(&r.entity) else { continue };
                if let (Some(slot), Material::Basic { color }) = (&mesh.basic, r.material) {
                    let uniforms = BasicUniforms { view_proj, model: r.model.to_cols_array_2d(), color };
                    self.queue.write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&uniforms));
                }
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        for pass in frame.passes {
            let scene = match pass.layer {
                SceneLayer::Backdrop => &frame.scenes.backdrop,
                SceneLayer::Foreground => &frame.scenes.foreground,
            };
            let load = match pass.color {
                ColorLoad::Clear([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                ColorLoad::Keep => wgpu::LoadOp::Load,
            };
            let depth_load = if pass.clear_depth { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color,
                    resolve_target: Some(&view),
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for r in scene.renderables() {
                let Some(mesh) = self.meshes.get(&r.entity) else { continue };
                let (pipeline, bind_group) = match (&mesh.material, &mesh.basic) {
                    (Material::Plane, _) => (&self.plane_pipeline, &self.plane_uniforms.bind_group),
                    (Material::Tubes, _) => (&self.tube_pipeline, &self.tube_uniforms.bind_group),
                    (Material::Basic { .. }, Some(slot)) => (&self.basic_pipeline, &slot.bind_group),
                    (Material::Basic { .. }, None) => continue,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
            }
        }

        if self.overlay.visible {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                // Matches the capped drawing-buffer density.
                pixels_per_point: self.window.scale_factor().min(MAX_PIXEL_RATIO) as f32,
            };
            self.overlay.render(
                &self.device,
                &self.queue,
                &mut encoder,
                &self.window,
                &view,
                &screen_descriptor,
                frame.stats,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    label: &str,
    source: &str,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Every surface in the scene is double-sided.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: SAMPLE_COUNT,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

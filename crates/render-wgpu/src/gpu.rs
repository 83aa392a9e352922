use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use pointgrid_common::{SketchError, SketchResult};
use pointgrid_scene::{
    COORDINATES_ATTRIBUTE, DEFAULT_GRID_SIDE, GRID_SIDE_UNIFORM, MeshId, POSITION_ATTRIBUTE,
    PROGRESS_UNIFORM, PerspectiveCamera, Points, Scene, Side,
};
use wgpu::util::DeviceExt;

use crate::shaders::{FRAGMENT_ENTRY, VERTEX_ENTRY};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Samples per pixel when antialiasing is on.
pub const MSAA_SAMPLES: u32 = 4;

/// Sample count requested for the given antialias setting.
pub fn sample_count(antialias: bool) -> u32 {
    if antialias { MSAA_SAMPLES } else { 1 }
}

/// Highest of `requested` and 1 that both the color and depth formats support.
pub fn supported_sample_count(
    adapter: &wgpu::Adapter,
    format: wgpu::TextureFormat,
    requested: u32,
) -> u32 {
    if requested <= 1 {
        return 1;
    }
    let color = adapter.get_texture_format_features(format).flags;
    let depth = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
    if color.sample_count_supported(requested) && depth.sample_count_supported(requested) {
        requested
    } else {
        tracing::warn!(requested, ?format, "multisampling unsupported, drawing aliased");
        1
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    progress: f32,
    grid_side: f32,
    _pad: [f32; 2],
}

impl Uniforms {
    fn new(view_proj: Mat4, progress: f32, grid_side: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            progress,
            grid_side,
            _pad: [0.0; 2],
        }
    }

    fn for_mesh(view_proj: Mat4, points: &Points) -> Self {
        let material = &points.material;
        Self::new(
            view_proj,
            material.float(PROGRESS_UNIFORM).unwrap_or(0.0),
            material
                .float(GRID_SIDE_UNIFORM)
                .unwrap_or(DEFAULT_GRID_SIDE as f32),
        )
    }
}

fn multisample_state(sample_count: u32) -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: sample_count,
        mask: !0,
        alpha_to_coverage_enabled: false,
    }
}

fn depth_texture_descriptor(
    width: u32,
    height: u32,
    sample_count: u32,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("points_depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    }
}

/// Multisampled color target resolved into the swapchain image each frame.
fn msaa_texture_descriptor(
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    sample_count: u32,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("points_msaa_texture"),
        format,
        ..depth_texture_descriptor(width, height, sample_count)
    }
}

/// GPU resources of one uploaded [`Points`] mesh.
struct GpuPoints {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    position_buffer: wgpu::Buffer,
    coordinate_buffer: wgpu::Buffer,
    point_count: u32,
}

/// Draws point-list meshes with their own shader materials.
pub struct PointsRenderer {
    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    meshes: BTreeMap<MeshId, GpuPoints>,
    depth_texture: wgpu::TextureView,
    msaa_texture: Option<wgpu::TextureView>,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
}

impl PointsRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("points_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("points_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let depth_texture =
            create_view(device, &depth_texture_descriptor(width, height, sample_count));
        let msaa_texture =
            Self::create_msaa_texture(device, surface_format, width, height, sample_count);

        Self {
            uniform_layout,
            pipeline_layout,
            meshes: BTreeMap::new(),
            depth_texture,
            msaa_texture,
            surface_format,
            sample_count,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Compile the mesh's shaders and copy its attributes to the GPU.
    ///
    /// Shader and pipeline validation errors are captured and returned as
    /// `Asset` errors instead of reaching the device's panic handler.
    pub fn upload(&mut self, device: &wgpu::Device, id: MeshId, points: &Points) -> SketchResult<()> {
        let positions = points
            .geometry
            .attribute(POSITION_ATTRIBUTE)
            .ok_or_else(|| SketchError::configuration("mesh has no position attribute"))?;
        let coordinates = points
            .geometry
            .attribute(COORDINATES_ATTRIBUTE)
            .ok_or_else(|| SketchError::configuration("mesh has no coordinates attribute"))?;
        if coordinates.count() != positions.count() {
            return Err(SketchError::configuration(format!(
                "attribute counts differ: {} positions, {} coordinates",
                positions.count(),
                coordinates.count()
            )));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("points_vertex_shader"),
            source: wgpu::ShaderSource::Wgsl(points.material.shaders.vertex.as_str().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("points_fragment_shader"),
            source: wgpu::ShaderSource::Wgsl(points.material.shaders.fragment.as_str().into()),
        });

        let cull_mode = match points.material.side {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("points_pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: (positions.item_size() * std::mem::size_of::<f32>()) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: (coordinates.item_size() * std::mem::size_of::<f32>()) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![1 => Float32x3],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                cull_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: multisample_state(self.sample_count),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(SketchError::asset(format!("shader program rejected: {err}")));
        }

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("points_uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms::for_mesh(Mat4::IDENTITY, points)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("points_bind_group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("points_position_buffer"),
            contents: bytemuck::cast_slice(positions.as_slice()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let coordinate_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("points_coordinate_buffer"),
            contents: bytemuck::cast_slice(coordinates.as_slice()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let point_count = positions.count() as u32;
        tracing::debug!(mesh = id.0, points = point_count, "mesh uploaded to GPU");

        self.meshes.insert(
            id,
            GpuPoints {
                pipeline,
                uniform_buffer,
                bind_group,
                position_buffer,
                coordinate_buffer,
                point_count,
            },
        );
        Ok(())
    }

    /// Recreate the size-dependent depth and multisample targets.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture =
            create_view(device, &depth_texture_descriptor(width, height, self.sample_count));
        self.msaa_texture = Self::create_msaa_texture(
            device,
            self.surface_format,
            width,
            height,
            self.sample_count,
        );
    }

    /// Render one frame: every uploaded mesh of `scene`, seen through `camera`.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) {
        let view_proj = camera.view_projection();

        let drawable: Vec<&GpuPoints> = scene
            .children()
            .filter_map(|(id, points)| {
                let gpu = self.meshes.get(&id)?;
                queue.write_buffer(
                    &gpu.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&Uniforms::for_mesh(view_proj, points)),
                );
                Some(gpu)
            })
            .collect();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("points_encoder"),
        });

        // Multisampled frames are drawn off-screen and resolved into `view`.
        let (target, resolve_target, store) = match &self.msaa_texture {
            Some(msaa) => (msaa, Some(view), wgpu::StoreOp::Discard),
            None => (view, None, wgpu::StoreOp::Store),
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("points_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for gpu in drawable.iter().filter(|g| g.point_count > 0) {
                pass.set_pipeline(&gpu.pipeline);
                pass.set_bind_group(0, &gpu.bind_group, &[]);
                pass.set_vertex_buffer(0, gpu.position_buffer.slice(..));
                pass.set_vertex_buffer(1, gpu.coordinate_buffer.slice(..));
                pass.draw(0..gpu.point_count, 0..1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_msaa_texture(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Option<wgpu::TextureView> {
        (sample_count > 1).then(|| {
            create_view(
                device,
                &msaa_texture_descriptor(format, width, height, sample_count),
            )
        })
    }
}

fn create_view(device: &wgpu::Device, desc: &wgpu::TextureDescriptor) -> wgpu::TextureView {
    device.create_texture(desc).create_view(&Default::default())
}

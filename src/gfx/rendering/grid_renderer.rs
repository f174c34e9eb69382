//! Full-screen grid display
//!
//! Draws the current grid buffer as a 6-vertex quad. The fragment shader
//! picks the nearest cell and looks its byte up in the color map.

use wgpu::util::DeviceExt;
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use crate::error::{LifeError, Result};
use crate::gfx::context::GpuContext;
use crate::gfx::grid_store::GridStore;
use crate::gfx::resources::texture_resource::TextureResource;
use crate::wgpu_utils::{binding_types, fragment_entry};

/// Quad vertex: clip-space position and grid uv (v grows downwards)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [VertexAttribute; 2] = [
        VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: VertexFormat::Float32x2,
        },
        VertexAttribute {
            offset: std::mem::size_of::<[f32; 2]>() as BufferAddress,
            shader_location: 1,
            format: VertexFormat::Float32x2,
        },
    ];

    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles covering the viewport
#[rustfmt::skip]
pub const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, 1.0], tex_coords: [0.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], tex_coords: [1.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], tex_coords: [1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },
    QuadVertex { position: [-1.0, 1.0], tex_coords: [0.0, 0.0] },
];

pub struct GridRenderer {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    vertex_buffer: wgpu::Buffer,
    color_map: TextureResource,
    /// One per ring slot, indexed by the slot being displayed
    bind_groups: Vec<wgpu::BindGroup>,
}

impl GridRenderer {
    pub fn new(
        ctx: &GpuContext,
        target_format: wgpu::TextureFormat,
        color_map: TextureResource,
    ) -> Result<Self> {
        let device = &ctx.device;
        ctx.scoped(
            wgpu::ErrorFilter::Validation,
            || {
                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("Grid Display Shader"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("grid_display.wgsl").into()),
                });

                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Grid Display Layout"),
                    entries: &[
                        fragment_entry(0, binding_types::uniform()),
                        fragment_entry(1, binding_types::storage_buffer_read_only()),
                        fragment_entry(2, binding_types::texture_2d()),
                        fragment_entry(
                            3,
                            binding_types::sampler(wgpu::SamplerBindingType::Filtering),
                        ),
                    ],
                });

                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("Grid Display Pipeline Layout"),
                        bind_group_layouts: &[&layout],
                        push_constant_ranges: &[],
                    });

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Grid Display Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[QuadVertex::desc()],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: target_format,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Grid Quad Vertex Buffer"),
                    contents: bytemuck::cast_slice(&QUAD_VERTICES),
                    usage: wgpu::BufferUsages::VERTEX,
                });

                Self {
                    pipeline,
                    layout,
                    vertex_buffer,
                    color_map,
                    bind_groups: Vec::new(),
                }
            },
            |reason| LifeError::pipeline("grid_display", reason),
        )
    }

    /// Rebuilds the per-slot bind groups for a freshly allocated store
    pub fn bind(&mut self, device: &wgpu::Device, store: &GridStore) {
        self.bind_groups = store
            .buffers()
            .enumerate()
            .map(|(slot, buffer)| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Grid Display Bind Group {slot}")),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: store.params().binding_resource(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&self.color_map.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::Sampler(&self.color_map.sampler),
                        },
                    ],
                })
            })
            .collect();
    }

    /// Records a pass drawing ring slot `slot` into `view`
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, slot: usize) {
        let Some(bind_group) = self.bind_groups.get(slot) else {
            log::warn!("No display bind group for grid slot {slot}");
            return;
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Grid Display Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

//! Transition kernel dispatch
//!
//! Bind groups are built once per ring slot: the group for head `h` reads
//! slot `h` and writes slot `h + 1`, so a frame only picks the group that
//! matches the store's current index.

use crate::error::{LifeError, Result};
use crate::gfx::context::GpuContext;
use crate::gfx::grid_store::GridStore;
use crate::simulation::rules::{tile_count, TILE_SIZE};
use crate::wgpu_utils::{binding_types, compute_entry};

pub struct SimulationStage {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    bind_groups: Vec<wgpu::BindGroup>,
    dispatch_size: (u32, u32),
}

impl SimulationStage {
    pub fn new(ctx: &GpuContext) -> Result<Self> {
        let device = &ctx.device;
        ctx.scoped(
            wgpu::ErrorFilter::Validation,
            || {
                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Game of Life Layout"),
                    entries: &[
                        compute_entry(0, binding_types::uniform()),
                        compute_entry(1, binding_types::storage_buffer_read_only()),
                        compute_entry(2, binding_types::storage_buffer_read_write()),
                    ],
                });
                let pipeline = create_compute_pipeline(
                    device,
                    "Game of Life",
                    include_str!("game_of_life.wgsl"),
                    &layout,
                );
                Self {
                    pipeline,
                    layout,
                    bind_groups: Vec::new(),
                    dispatch_size: (0, 0),
                }
            },
            |reason| LifeError::pipeline("game_of_life", reason),
        )
    }

    /// Rebuilds the per-slot bind groups for a freshly allocated store
    pub fn bind(&mut self, device: &wgpu::Device, store: &GridStore) {
        let depth = store.depth();
        self.bind_groups = (0..depth)
            .filter_map(|head| {
                let read = store.buffer(head)?;
                let write = store.buffer((head + 1) % depth)?;
                Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Game of Life Bind Group {head}")),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: store.params().binding_resource(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: read.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: write.as_entire_binding(),
                        },
                    ],
                }))
            })
            .collect();

        let size = store.size();
        self.dispatch_size = (tile_count(size.width), tile_count(size.height));
        log::debug!(
            "Transition kernel: {}x{} tiles of {TILE_SIZE}x{TILE_SIZE}",
            self.dispatch_size.0,
            self.dispatch_size.1
        );
    }

    /// Records one generation from the store's current slot into its write target
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, store: &GridStore) {
        let Some(bind_group) = self.bind_groups.get(store.current_index()) else {
            log::warn!("Simulation stage is not bound to the current grid, skipping step");
            return;
        };

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Game of Life Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, bind_group, &[]);
        compute_pass.dispatch_workgroups(self.dispatch_size.0, self.dispatch_size.1, 1);
    }
}

/// Compiles `source` and builds a compute pipeline with entry point `main`
pub(crate) fn create_compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::ComputePipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Pipeline Layout")),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{label} Pipeline")),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

//! Activation kernel dispatch
//!
//! Runs in the same encoder as the transition pass, after it, against the
//! same write target. wgpu orders the two passes, so the override always
//! sees the finished generation.

use crate::error::{LifeError, Result};
use crate::gfx::context::GpuContext;
use crate::gfx::grid_store::GridStore;
use crate::simulation::GpuActivationPoint;
use crate::wgpu_utils::{binding_types, compute_entry, ArrayBuffer, UniformBuffer};

use super::simulation_stage::create_compute_pipeline;

/// Threads per workgroup in `activate.wgsl`
pub const ACTIVATION_WORKGROUP: u32 = 64;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ActivationParams {
    pub count: u32,
    pub width: u32,
    pub height: u32,
    pub _padding: u32,
}

pub struct ActivationStage {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    points: ArrayBuffer<GpuActivationPoint>,
    params: UniformBuffer<ActivationParams>,
}

impl ActivationStage {
    pub fn new(ctx: &GpuContext) -> Result<Self> {
        let device = &ctx.device;
        ctx.scoped(
            wgpu::ErrorFilter::Validation,
            || {
                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Activation Layout"),
                    entries: &[
                        compute_entry(0, binding_types::uniform()),
                        compute_entry(1, binding_types::storage_buffer_read_only()),
                        compute_entry(2, binding_types::storage_buffer_read_write()),
                    ],
                });
                let pipeline = create_compute_pipeline(
                    device,
                    "Activation",
                    include_str!("activate.wgsl"),
                    &layout,
                );
                Self {
                    pipeline,
                    layout,
                    points: ArrayBuffer::new(device, 64),
                    params: UniformBuffer::new_with_data(
                        device,
                        &ActivationParams {
                            count: 0,
                            width: 1,
                            height: 1,
                            _padding: 0,
                        },
                    ),
                }
            },
            |reason| LifeError::pipeline("activate", reason),
        )
    }

    /// Records the override pass for `points` into the store's write target
    ///
    /// Returns `false` without recording anything when `points` is empty.
    pub fn encode(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        store: &GridStore,
        points: &[GpuActivationPoint],
    ) -> bool {
        if points.is_empty() {
            return false;
        }

        let size = store.size();
        self.points.upload(&ctx.device, &ctx.queue, points);
        self.params.update_content(
            &ctx.queue,
            ActivationParams {
                count: points.len() as u32,
                width: size.width,
                height: size.height,
                _padding: 0,
            },
        );

        // Built per dispatch: the point buffer may have grown and the write
        // target changes every frame.
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Activation Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.points.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: store.write_target().as_entire_binding(),
                },
            ],
        });

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Activation Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(
            (points.len() as u32).div_ceil(ACTIVATION_WORKGROUP),
            1,
            1,
        );
        log::trace!("Activation pass over {} points", points.len());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<ActivationParams>(), 16);
        assert_eq!(std::mem::size_of::<GpuActivationPoint>(), 16);
    }
}

//! Device and queue ownership
//!
//! One [`GpuContext`] is shared by the grid store, both compute stages and
//! the renderer. It can be created against a window surface or headless.

use std::sync::Arc;

use crate::error::{LifeError, Result};

/// Adapter, device and queue for the lifetime of the session
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    /// Requests an adapter able to present to `compatible_surface` (if any)
    /// and a device with enough storage-buffer room for large grids
    pub async fn from_instance(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| LifeError::NoAdapter(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lifegrid device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
                    max_buffer_size: adapter_limits.max_buffer_size,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured device error: {error}");
        }));

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Context without a presentation surface, for offscreen work and tests
    pub async fn headless() -> Result<Self> {
        Self::from_instance(Self::create_instance(), None).await
    }

    /// Largest grid buffer the device will bind, in bytes
    pub fn max_grid_bytes(&self) -> u64 {
        let limits = self.device.limits();
        u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size)
    }

    /// Runs `op` inside an error scope and turns a captured error into `on_error(message)`
    pub fn scoped<T>(
        &self,
        filter: wgpu::ErrorFilter,
        op: impl FnOnce() -> T,
        on_error: impl FnOnce(String) -> LifeError,
    ) -> Result<T> {
        self.device.push_error_scope(filter);
        let value = op();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(on_error(error.to_string())),
            None => Ok(value),
        }
    }

    /// Lets pending map and completion callbacks run without blocking
    pub fn pump(&self) {
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::trace!("Device poll: {e}");
        }
    }
}

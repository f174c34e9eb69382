//! Frame coordinator
//!
//! [`LifeEngine`] owns every GPU resource and drives one frame per
//! [`LifeEngine::tick`]:
//!
//! 1. apply a debounced resize, if one is due;
//! 2. wait for an in-flight slot (the only blocking point);
//! 3. record the transition pass, then the activation pass if any points
//!    are pending;
//! 4. rotate the ring and record the display pass for the new current slot;
//! 5. submit, hand the slot to the completion callback, present.
//!
//! Everything except the [`ActivationQueue`] is touched only from the thread
//! calling `tick`.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::LifeConfig;
use crate::error::Result;
use crate::gfx::{
    resources::default_color_ramp, ActivationStage, DisplaySurface, GpuContext, GridRenderer,
    GridStore, SimulationStage, TextureResource,
};
use crate::performance::{FrameMetrics, FrameMonitor};
use crate::simulation::{
    ActivationPoint, ActivationQueue, GpuActivationPoint, Grid, GridSize, InFlightLimiter,
    ResizeDebouncer,
};

/// What a call to [`LifeEngine::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Sequence number of the frame, starting at 1
    pub frame: u64,
    /// Ring slot written and displayed by this frame
    pub slot: usize,
    /// Number of activation points applied
    pub activations: usize,
    /// Whether a drawable was presented
    pub presented: bool,
    /// Whether the grid was reallocated before simulating
    pub reallocated: bool,
}

pub struct LifeEngine {
    ctx: GpuContext,
    surface: Option<DisplaySurface>,
    config: LifeConfig,
    store: GridStore,
    simulation: SimulationStage,
    activation: ActivationStage,
    renderer: GridRenderer,
    activations: ActivationQueue,
    limiter: InFlightLimiter,
    resize: ResizeDebouncer<GridSize>,
    rng: StdRng,
    monitor: FrameMonitor,
    frame: u64,
}

impl LifeEngine {
    /// Builds the engine around `ctx` with the default color ramp
    ///
    /// Without a surface, frames are simulated but never displayed.
    pub fn new(
        ctx: GpuContext,
        surface: Option<DisplaySurface>,
        grid_size: GridSize,
        config: LifeConfig,
    ) -> Result<Self> {
        Self::with_color_map(ctx, surface, grid_size, config, &default_color_ramp())
    }

    /// Builds the engine with a caller-supplied 256-entry RGBA color map
    pub fn with_color_map(
        ctx: GpuContext,
        surface: Option<DisplaySurface>,
        grid_size: GridSize,
        config: LifeConfig,
        color_map_rgba: &[u8],
    ) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let color_map =
            TextureResource::create_color_map(&ctx.device, &ctx.queue, color_map_rgba, "Color Map")?;
        let target_format = surface
            .as_ref()
            .map_or(TextureResource::COLOR_MAP_FORMAT, DisplaySurface::format);

        let store = GridStore::allocate(
            &ctx,
            grid_size,
            config.initial_alive_probability,
            config.ring_depth,
            &mut rng,
        )?;
        let mut simulation = SimulationStage::new(&ctx)?;
        let activation = ActivationStage::new(&ctx)?;
        let mut renderer = GridRenderer::new(&ctx, target_format, color_map)?;
        simulation.bind(&ctx.device, &store);
        renderer.bind(&ctx.device, &store);

        Ok(Self {
            limiter: InFlightLimiter::new(config.max_frames_in_flight, config.stall_warning),
            resize: ResizeDebouncer::new(config.resize_debounce),
            ctx,
            surface,
            store,
            simulation,
            activation,
            renderer,
            activations: ActivationQueue::new(),
            rng,
            monitor: FrameMonitor::new(),
            frame: 0,
            config,
        })
    }

    pub fn grid_size(&self) -> GridSize {
        self.store.size()
    }

    /// Slot currently eligible for display
    pub fn current_slot(&self) -> usize {
        self.store.current_index()
    }

    pub fn limiter(&self) -> &InFlightLimiter {
        &self.limiter
    }

    /// Handle for pushing activations from another thread
    pub fn activation_queue(&self) -> ActivationQueue {
        self.activations.clone()
    }

    /// Queues a randomized activation around grid cell (`x`, `y`)
    ///
    /// Coordinates outside the grid wrap.
    pub fn request_activation(&self, x: i64, y: i64) {
        self.activations.push(ActivationPoint::new(x, y));
    }

    /// Resizes the surface now and schedules a grid rebuild after the
    /// debounce delay
    ///
    /// `width` and `height` are in physical pixels; the grid gets one cell
    /// per `pixel_scale` pixels. Zero-area displays are ignored.
    pub fn notify_display_size_changed(&mut self, width: u32, height: u32, pixel_scale: f64) {
        self.notify_display_size_changed_at(width, height, pixel_scale, Instant::now());
    }

    pub fn notify_display_size_changed_at(
        &mut self,
        width: u32,
        height: u32,
        pixel_scale: f64,
        now: Instant,
    ) {
        let Some(size) = GridSize::from_display(width, height, pixel_scale) else {
            log::debug!("Ignoring zero-area display {width}x{height}");
            return;
        };
        if let Some(surface) = &mut self.surface {
            surface.resize(&self.ctx.device, width, height);
        }
        log::trace!("Display now {width}x{height} @{pixel_scale}, grid rebuild pending");
        self.resize.notify(size, now);
    }

    /// Whether a debounced resize is waiting to fire
    pub fn resize_pending(&self) -> bool {
        self.resize.is_pending()
    }

    /// Discards the grid and reseeds it at the current size
    pub fn reseed(&mut self) -> Result<()> {
        self.reallocate(self.store.size())
    }

    /// Replaces the current grid with `grid`, reallocating if its size differs
    pub fn load(&mut self, grid: &Grid) -> Result<()> {
        if grid.size() != self.store.size() {
            self.reallocate(grid.size())?;
        }
        self.store.upload_current(&self.ctx.queue, grid)
    }

    /// Copies the displayed grid back to the host (blocking)
    pub fn snapshot(&self) -> Result<Grid> {
        self.store.read_current(&self.ctx)
    }

    /// Number of live cells in the displayed grid (blocking readback)
    pub fn population(&self) -> Result<usize> {
        Ok(self.snapshot()?.alive_count())
    }

    /// Frame timing averaged over the recent window
    pub fn metrics(&mut self) -> FrameMetrics {
        self.monitor.metrics().clone()
    }

    fn reallocate(&mut self, size: GridSize) -> Result<()> {
        // Old buffers stay alive inside wgpu until frames using them finish.
        self.store = GridStore::allocate(
            &self.ctx,
            size,
            self.config.initial_alive_probability,
            self.config.ring_depth,
            &mut self.rng,
        )?;
        self.simulation.bind(&self.ctx.device, &self.store);
        self.renderer.bind(&self.ctx.device, &self.store);
        Ok(())
    }

    /// Runs one frame; see the module docs for the sequence
    pub fn tick(&mut self) -> Result<FrameOutcome> {
        self.tick_at(Instant::now())
    }

    /// [`LifeEngine::tick`] with an explicit clock for the resize debounce
    pub fn tick_at(&mut self, now: Instant) -> Result<FrameOutcome> {
        self.monitor.begin_frame();

        let mut reallocated = false;
        if let Some(size) = self.resize.poll(now) {
            if size == self.store.size() {
                log::debug!("Resize settled at the current grid size, keeping state");
            } else {
                self.reallocate(size)?;
                reallocated = true;
            }
        }

        let wait_started = Instant::now();
        let ctx = &self.ctx;
        let slot = self.limiter.acquire(|| ctx.pump());
        let acquire_wait = wait_started.elapsed();

        let drawable = match &mut self.surface {
            Some(surface) => surface.acquire(&self.ctx.device)?,
            None => None,
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.simulation.encode(&mut encoder, &self.store);

        let size = self.store.size();
        let rng = &mut self.rng;
        let points: Vec<GpuActivationPoint> = self
            .activations
            .drain()
            .into_iter()
            .map(|point| GpuActivationPoint::new(point, size, rng))
            .collect();
        self.activation
            .encode(&self.ctx, &mut encoder, &self.store, &points);

        let current = self.store.rotate();

        if let Some(drawable) = &drawable {
            let view = drawable
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            self.renderer.encode(&mut encoder, &view, current);
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        self.ctx.queue.on_submitted_work_done(move || drop(slot));

        let presented = drawable.is_some();
        if let Some(drawable) = drawable {
            drawable.present();
        }

        self.frame += 1;
        self.monitor.end_frame(acquire_wait);
        if acquire_wait > Duration::from_millis(1) {
            log::trace!(
                "Frame {} waited {:.2} ms for a slot",
                self.frame,
                acquire_wait.as_secs_f64() * 1000.0
            );
        }

        Ok(FrameOutcome {
            frame: self.frame,
            slot: current,
            activations: points.len(),
            presented,
            reallocated,
        })
    }

    /// Blocks until all submitted frames have completed
    pub fn wait_idle(&self) -> Result<()> {
        self.ctx.device.poll(wgpu::PollType::Wait)?;
        Ok(())
    }
}

//! Device-resident grid ring
//!
//! Owns the rotating set of grid storage buffers (one `u32` word per cell,
//! holding the `ALIVE`/`DEAD` byte) plus the uniform describing their size.

use rand::Rng;
use wgpu::util::DeviceExt;

use crate::error::{LifeError, Result};
use crate::gfx::context::GpuContext;
use crate::simulation::{BufferRing, Grid, GridSize};
use crate::wgpu_utils::UniformBuffer;

/// Grid dimensions as seen by every shader, matches `GridParams` in WGSL
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridParams {
    pub width: u32,
    pub height: u32,
    pub _padding: [u32; 2],
}

impl From<GridSize> for GridParams {
    fn from(size: GridSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            _padding: [0; 2],
        }
    }
}

pub struct GridStore {
    size: GridSize,
    ring: BufferRing<wgpu::Buffer>,
    params: UniformBuffer<GridParams>,
}

impl GridStore {
    const WORD: u64 = std::mem::size_of::<u32>() as u64;

    /// Allocates `depth` grid buffers of `size` and seeds the current one
    /// with cells alive at `probability`
    ///
    /// Any previous store is simply dropped by the caller; wgpu keeps its
    /// buffers alive until in-flight work referencing them completes.
    pub fn allocate<R: Rng + ?Sized>(
        ctx: &GpuContext,
        size: GridSize,
        probability: f64,
        depth: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Self::check_fits(ctx, size)?;
        let initial = Grid::randomized(size, probability, rng);
        let store = Self::allocate_with(ctx, &initial, depth)?;
        log::info!(
            "Allocated {} grid buffers of {}x{}, {} cells alive",
            depth,
            size.width,
            size.height,
            initial.alive_count()
        );
        Ok(store)
    }

    /// Allocates the ring with `initial` as the current grid
    pub fn allocate_with(ctx: &GpuContext, initial: &Grid, depth: usize) -> Result<Self> {
        if depth < 2 {
            return Err(LifeError::config(format!(
                "grid ring needs at least two buffers, got {depth}"
            )));
        }
        let size = initial.size();
        let bytes = Self::check_fits(ctx, size)?;

        let device = &ctx.device;
        let usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let (buffers, params) = ctx.scoped(
            wgpu::ErrorFilter::OutOfMemory,
            || {
                // The last slot starts as current, so it carries the seed.
                let mut buffers: Vec<wgpu::Buffer> = (0..depth - 1)
                    .map(|slot| {
                        device.create_buffer(&wgpu::BufferDescriptor {
                            label: Some(&format!("Grid Buffer {slot}")),
                            size: bytes,
                            usage,
                            mapped_at_creation: false,
                        })
                    })
                    .collect();
                buffers.push(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Grid Buffer {}", depth - 1)),
                    contents: bytemuck::cast_slice(&initial.to_words()),
                    usage,
                }));
                let params = UniformBuffer::new_with_data(device, &GridParams::from(size));
                (buffers, params)
            },
            |reason| LifeError::allocation(format!("{}x{} grid", size.width, size.height), reason),
        )?;

        Ok(Self {
            size,
            ring: BufferRing::new(buffers),
            params,
        })
    }

    /// Byte size of one grid buffer, if the device can bind it
    fn check_fits(ctx: &GpuContext, size: GridSize) -> Result<u64> {
        let bytes = size.cell_count() as u64 * Self::WORD;
        if bytes > ctx.max_grid_bytes() {
            return Err(LifeError::allocation(
                format!("{}x{} grid", size.width, size.height),
                format!(
                    "{} bytes exceeds the device limit of {} bytes",
                    bytes,
                    ctx.max_grid_bytes()
                ),
            ));
        }
        Ok(bytes)
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn depth(&self) -> usize {
        self.ring.depth()
    }

    pub fn params(&self) -> &UniformBuffer<GridParams> {
        &self.params
    }

    /// Buffer most recently completed by the simulation; read-only use
    pub fn current_read_buffer(&self) -> &wgpu::Buffer {
        self.ring.current()
    }

    pub fn current_index(&self) -> usize {
        self.ring.current_index()
    }

    /// Least recently used buffer, the next simulation output
    pub fn write_target(&self) -> &wgpu::Buffer {
        self.ring.write_target()
    }

    pub fn buffer(&self, slot: usize) -> Option<&wgpu::Buffer> {
        self.ring.get(slot)
    }

    pub fn buffers(&self) -> impl Iterator<Item = &wgpu::Buffer> {
        self.ring.iter()
    }

    /// Marks the write target as current once its commands are encoded.
    /// Returns the slot that became current.
    pub fn rotate(&mut self) -> usize {
        self.ring.rotate()
    }

    /// Overwrites the current buffer with `grid`
    ///
    /// The write is ordered before the next submission on `queue`.
    pub fn upload_current(&self, queue: &wgpu::Queue, grid: &Grid) -> Result<()> {
        if grid.size() != self.size {
            return Err(LifeError::config(format!(
                "grid of {:?} does not fit a store of {:?}",
                grid.size(),
                self.size
            )));
        }
        queue.write_buffer(self.ring.current(), 0, bytemuck::cast_slice(&grid.to_words()));
        Ok(())
    }

    /// Copies the current buffer back to the host (blocking)
    pub fn read_current(&self, ctx: &GpuContext) -> Result<Grid> {
        self.read_slot(ctx, self.current_index())
    }

    pub fn read_slot(&self, ctx: &GpuContext, slot: usize) -> Result<Grid> {
        let source = self
            .ring
            .get(slot)
            .ok_or_else(|| LifeError::Readback(format!("no grid buffer in slot {slot}")))?;
        let bytes = self.size.cell_count() as u64 * Self::WORD;

        let staging_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Grid Readback Buffer"),
            size: bytes,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Grid Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(source, 0, &staging_buffer, 0, bytes);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only disappears if the caller has already given up.
            let _ = tx.send(result);
        });

        ctx.device.poll(wgpu::PollType::Wait)?;

        match futures::executor::block_on(rx) {
            Ok(Ok(())) => {
                let mapped = slice.get_mapped_range();
                let words: Vec<u32> = bytemuck::cast_slice(&mapped).to_vec();
                drop(mapped);
                staging_buffer.unmap();
                Ok(Grid::from_raw(self.size, words))
            }
            Ok(Err(e)) => Err(LifeError::Readback(e.to_string())),
            Err(_) => Err(LifeError::Readback("map callback was dropped".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn headless() -> Option<GpuContext> {
        match pollster::block_on(GpuContext::headless()) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }

    #[test]
    fn test_grid_params_layout() {
        assert_eq!(std::mem::size_of::<GridParams>(), 16);
        let params = GridParams::from(GridSize::new(7, 3));
        assert_eq!((params.width, params.height), (7, 3));
    }

    #[test]
    fn test_allocate_seeds_current_buffer() {
        let Some(ctx) = headless() else { return };
        let mut rng = StdRng::seed_from_u64(5);
        let size = GridSize::new(256, 256);
        let store = GridStore::allocate(&ctx, size, 0.1, 3, &mut rng).unwrap();

        assert_eq!(store.depth(), 3);
        assert_eq!(store.current_index(), 2);

        let grid = store.read_current(&ctx).unwrap();
        assert_eq!(grid.size(), size);
        let fraction = grid.alive_count() as f64 / size.cell_count() as f64;
        assert!((fraction - 0.1).abs() < 0.01, "alive fraction {fraction}");
    }

    #[test]
    fn test_upload_round_trips_through_device() {
        let Some(ctx) = headless() else { return };
        let size = GridSize::new(20, 10);
        let glider = Grid::from_pattern(size, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
        let store = GridStore::allocate_with(&ctx, &Grid::dead(size), 3).unwrap();

        store.upload_current(&ctx.queue, &glider).unwrap();
        assert_eq!(store.read_current(&ctx).unwrap(), glider);

        let wrong = Grid::dead(GridSize::new(4, 4));
        assert!(store.upload_current(&ctx.queue, &wrong).is_err());
    }

    #[test]
    fn test_oversized_grid_is_an_allocation_error() {
        let Some(ctx) = headless() else { return };
        let side = (ctx.max_grid_bytes() / 4) as f64;
        let side = side.sqrt() as u32 + 2;
        let mut rng = StdRng::seed_from_u64(1);
        let result = GridStore::allocate(&ctx, GridSize::new(side, side), 0.0, 3, &mut rng);
        assert!(matches!(result, Err(LifeError::Allocation { .. })));
    }
}

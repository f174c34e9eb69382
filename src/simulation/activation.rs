//! User-triggered cell activation
//!
//! Input handlers push grid coordinates onto an [`ActivationQueue`] from any
//! thread; the frame coordinator drains it once per simulation dispatch and
//! hands the points to the activation kernel. [`apply_activation`] is the
//! host mirror of that kernel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;

use super::grid::{Grid, GridSize};

/// Grid coordinate submitted by the caller, in grid space
///
/// Out-of-range values are legal and wrap around the torus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationPoint {
    pub x: i64,
    pub y: i64,
}

impl ActivationPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Device layout of one activation request, matches `activate.wgsl`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuActivationPoint {
    pub x: u32,
    pub y: u32,
    pub seed: u32,
    pub _padding: u32,
}

impl GpuActivationPoint {
    /// Wraps `point` into `size` and attaches a neighbourhood seed
    pub fn new<R: Rng + ?Sized>(point: ActivationPoint, size: GridSize, rng: &mut R) -> Self {
        let (x, y) = size.wrap(point.x, point.y);
        Self {
            x,
            y,
            seed: rng.random(),
            _padding: 0,
        }
    }
}

/// PCG hash, bit-identical to `pcg_hash` in `activate.wgsl`
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Whether the cell at row-major index `k` of the 3×3 block is activated
///
/// The center (`k == 4`) always is; the others follow the seed's hash.
pub fn neighborhood_bit(seed: u32, k: u32) -> bool {
    k == 4 || pcg_hash(seed ^ pcg_hash(k)) & 1 == 1
}

/// Sets the randomized 3×3 neighbourhood of `point` alive in `grid`
///
/// Cells not selected keep their current value.
pub fn apply_activation(grid: &mut Grid, point: &GpuActivationPoint) {
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let k = ((dy + 1) * 3 + (dx + 1)) as u32;
            if neighborhood_bit(point.seed, k) {
                grid.set(point.x as i64 + dx, point.y as i64 + dy, true);
            }
        }
    }
}

/// Pending activation requests
///
/// Cloning yields another handle to the same list, so an input thread can
/// append while the frame loop drains.
#[derive(Debug, Clone, Default)]
pub struct ActivationQueue {
    pending: Arc<Mutex<Vec<ActivationPoint>>>,
}

impl ActivationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ActivationPoint>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, point: ActivationPoint) {
        self.lock().push(point);
    }

    /// Takes every pending point and leaves the list empty
    ///
    /// Copy and clear happen under one lock, so a concurrent `push` lands
    /// either in this batch or the next, never both and never neither.
    pub fn drain(&self) -> Vec<ActivationPoint> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

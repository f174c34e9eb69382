//! Host-side grid representation
//!
//! One byte per cell, row-major, in the same sentinel encoding the GPU
//! buffers carry. Used for initial uploads, readback, and as the reference
//! model the compute kernels are checked against.

use rand::Rng;

/// Stored value of a live cell
pub const ALIVE: u8 = 0;
/// Stored value of a dead cell
pub const DEAD: u8 = 255;

/// Dimensions of the simulated domain in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Grid size for a display surface: one cell per logical point
    ///
    /// Returns `None` for a zero-area surface (a minimized window), which
    /// must not trigger a reallocation.
    pub fn from_display(width: u32, height: u32, pixel_scale: f64) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let scale = if pixel_scale.is_finite() && pixel_scale > 0.0 {
            pixel_scale
        } else {
            1.0
        };
        let w = (width as f64 / scale).floor() as u32;
        let h = (height as f64 / scale).floor() as u32;
        Some(Self::new(w, h))
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of a toroidally wrapped coordinate
    pub fn wrapped_index(&self, x: i64, y: i64) -> usize {
        let wx = x.rem_euclid(self.width as i64) as usize;
        let wy = y.rem_euclid(self.height as i64) as usize;
        wy * self.width as usize + wx
    }

    /// Wraps an arbitrary coordinate into the domain
    pub fn wrap(&self, x: i64, y: i64) -> (u32, u32) {
        (
            x.rem_euclid(self.width as i64) as u32,
            y.rem_euclid(self.height as i64) as u32,
        )
    }
}

/// A 2D array of cell states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: GridSize,
    cells: Vec<u8>,
}

impl Grid {
    /// All-dead grid
    pub fn dead(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![DEAD; size.cell_count()],
        }
    }

    /// Each cell independently alive with `probability`
    pub fn randomized<R: Rng + ?Sized>(size: GridSize, probability: f64, rng: &mut R) -> Self {
        let p = probability.clamp(0.0, 1.0);
        let cells = (0..size.cell_count())
            .map(|_| if rng.random_bool(p) { ALIVE } else { DEAD })
            .collect();
        Self { size, cells }
    }

    /// Dead grid with the given coordinates alive (wrapped)
    pub fn from_pattern(size: GridSize, alive: &[(i64, i64)]) -> Self {
        let mut grid = Self::dead(size);
        for &(x, y) in alive {
            grid.set(x, y, true);
        }
        grid
    }

    /// Wraps raw cell values read back from the device
    ///
    /// Any value other than the live sentinel is treated as dead so the
    /// two-state invariant holds.
    pub fn from_raw(size: GridSize, raw: impl IntoIterator<Item = u32>) -> Self {
        let cells: Vec<u8> = raw
            .into_iter()
            .take(size.cell_count())
            .map(|v| if v == ALIVE as u32 { ALIVE } else { DEAD })
            .collect();
        debug_assert_eq!(cells.len(), size.cell_count());
        Self { size, cells }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Cell values widened to one `u32` word per cell, the device layout
    pub fn to_words(&self) -> Vec<u32> {
        self.cells.iter().map(|&c| c as u32).collect()
    }

    pub fn get_wrapped(&self, x: i64, y: i64) -> u8 {
        self.cells[self.size.wrapped_index(x, y)]
    }

    pub fn is_alive(&self, x: i64, y: i64) -> bool {
        self.get_wrapped(x, y) == ALIVE
    }

    pub fn set(&mut self, x: i64, y: i64, alive: bool) {
        let index = self.size.wrapped_index(x, y);
        self.cells[index] = if alive { ALIVE } else { DEAD };
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == ALIVE).count()
    }

    /// Coordinates of all live cells, row-major
    pub fn alive_cells(&self) -> Vec<(u32, u32)> {
        let w = self.size.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == ALIVE)
            .map(|(i, _)| ((i % w) as u32, (i / w) as u32))
            .collect()
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }
}

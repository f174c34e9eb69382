//! Conway transition rule, host reference
//!
//! [`next_cell_state`] is the same pure function the `game_of_life.wgsl`
//! kernel evaluates per invocation; [`step`] walks the grid in the kernel's
//! 16×16 tiles so partial edge tiles take the same early-exit path.

use super::grid::{Grid, ALIVE, DEAD};

/// Compute tile edge length, matches `@workgroup_size(16, 16)` in the kernel
pub const TILE_SIZE: u32 = 16;

/// Number of live cells among the 8 toroidally wrapped neighbours
pub fn live_neighbors(grid: &Grid, x: u32, y: u32) -> u32 {
    let (x, y) = (x as i64, y as i64);
    let mut count = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if (dx, dy) != (0, 0) && grid.is_alive(x + dx, y + dy) {
                count += 1;
            }
        }
    }
    count
}

/// New value of cell (x, y) after one generation
pub fn next_cell_state(grid: &Grid, x: u32, y: u32) -> u8 {
    let neighbors = live_neighbors(grid, x, y);
    let alive = grid.is_alive(x as i64, y as i64);
    match (alive, neighbors) {
        (true, 2) | (true, 3) => ALIVE,
        (false, 3) => ALIVE,
        _ => DEAD,
    }
}

/// Number of tiles needed to cover `extent` cells
pub fn tile_count(extent: u32) -> u32 {
    extent.div_ceil(TILE_SIZE)
}

/// Writes the next generation of `read` into `write`
///
/// `write` is fully overwritten, `read` is untouched.
///
/// # Panics
/// Panics if the two grids differ in size.
pub fn step(read: &Grid, write: &mut Grid) {
    assert_eq!(read.size(), write.size(), "read and write grids must match");
    let size = read.size();
    let width = size.width as usize;

    for tile_y in 0..tile_count(size.height) {
        for tile_x in 0..tile_count(size.width) {
            for local_y in 0..TILE_SIZE {
                for local_x in 0..TILE_SIZE {
                    let x = tile_x * TILE_SIZE + local_x;
                    let y = tile_y * TILE_SIZE + local_y;
                    if x >= size.width || y >= size.height {
                        continue;
                    }
                    write.cells_mut()[y as usize * width + x as usize] =
                        next_cell_state(read, x, y);
                }
            }
        }
    }
}

/// Convenience: the generation after `grid`
pub fn advance(grid: &Grid) -> Grid {
    let mut next = Grid::dead(grid.size());
    step(grid, &mut next);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::grid::GridSize;
    use rand::{rngs::StdRng, SeedableRng};

    const GLIDER: [(i64, i64); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

    fn shifted(cells: &[(i64, i64)], dx: i64, dy: i64) -> Vec<(i64, i64)> {
        cells.iter().map(|&(x, y)| (x + dx, y + dy)).collect()
    }

    #[test]
    fn test_survival_and_death_follow_neighbor_count() {
        let mut rng = StdRng::seed_from_u64(99);
        let grid = Grid::randomized(GridSize::new(37, 21), 0.35, &mut rng);
        let next = advance(&grid);

        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let n = live_neighbors(&grid, x, y);
                let was_alive = grid.is_alive(x as i64, y as i64);
                let is_alive = next.is_alive(x as i64, y as i64);
                if was_alive {
                    assert_eq!(is_alive, n == 2 || n == 3, "live cell ({x},{y}) with {n}");
                } else {
                    assert_eq!(is_alive, n == 3, "dead cell ({x},{y}) with {n}");
                }
            }
        }
    }

    #[test]
    fn test_all_dead_is_fixed_point() {
        let grid = Grid::dead(GridSize::new(40, 17));
        assert_eq!(advance(&grid), grid);
    }

    #[test]
    fn test_neighbors_wrap_around_edges() {
        let grid = Grid::from_pattern(GridSize::new(8, 8), &[(7, 7), (0, 7), (7, 0)]);
        assert_eq!(live_neighbors(&grid, 0, 0), 3);
        // (0, 0) is dead with exactly three neighbours across the seams
        assert!(advance(&grid).is_alive(0, 0));
    }

    #[test]
    fn test_blinker_oscillates() {
        let size = GridSize::new(9, 9);
        let vertical = Grid::from_pattern(size, &[(4, 3), (4, 4), (4, 5)]);
        let horizontal = Grid::from_pattern(size, &[(3, 4), (4, 4), (5, 4)]);

        assert_eq!(advance(&vertical), horizontal);
        assert_eq!(advance(&horizontal), vertical);
    }

    #[test]
    fn test_glider_translates_diagonally_every_four_steps() {
        let size = GridSize::new(32, 32);
        let start = Grid::from_pattern(size, &shifted(&GLIDER, 4, 4));

        let mut grid = start.clone();
        for generation in 1..=4 {
            grid = advance(&grid);
            assert_eq!(grid.alive_count(), 5, "generation {generation}");
        }
        assert_eq!(grid, Grid::from_pattern(size, &shifted(&GLIDER, 5, 5)));

        for _ in 0..4 {
            grid = advance(&grid);
        }
        assert_eq!(grid, Grid::from_pattern(size, &shifted(&GLIDER, 6, 6)));
    }

    #[test]
    fn test_partial_tiles_cover_whole_grid() {
        assert_eq!(tile_count(16), 1);
        assert_eq!(tile_count(17), 2);
        assert_eq!(tile_count(1), 1);

        // 17x33 leaves partial tiles on both axes; a full row of live cells
        // along the last row must still evolve.
        let size = GridSize::new(17, 33);
        let row: Vec<(i64, i64)> = (0..17).map(|x| (x, 32)).collect();
        let grid = Grid::from_pattern(size, &row);
        let next = advance(&grid);
        // A full wrapped row: every cell has exactly two live neighbours and
        // survives; cells above and below (wrapping to row 0) see three and
        // are born.
        assert!(next.is_alive(16, 32));
        assert!(next.is_alive(0, 31));
        assert!(next.is_alive(5, 0));
        assert_eq!(next.alive_count(), 17 * 3);
    }

    #[test]
    fn test_step_leaves_read_grid_untouched() {
        let mut rng = StdRng::seed_from_u64(5);
        let read = Grid::randomized(GridSize::new(20, 20), 0.3, &mut rng);
        let snapshot = read.clone();
        let mut write = Grid::randomized(GridSize::new(20, 20), 0.9, &mut rng);
        step(&read, &mut write);
        assert_eq!(read, snapshot);
        assert_eq!(write, advance(&read));
    }
}

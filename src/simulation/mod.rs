//! Simulation model
//!
//! Host-side pieces of the engine that do not touch the GPU: the grid and
//! its sentinel encoding, the Conway rule, the rotating buffer ring, the
//! activation queue, the in-flight limiter, and resize debouncing. The
//! compute kernels in [`crate::gfx`] are checked against these.

pub mod activation;
pub mod debounce;
pub mod grid;
pub mod in_flight;
pub mod ring;
pub mod rules;

// Re-export main types
pub use activation::{ActivationPoint, ActivationQueue, GpuActivationPoint};
pub use debounce::ResizeDebouncer;
pub use grid::{Grid, GridSize, ALIVE, DEAD};
pub use in_flight::{FrameSlot, InFlightLimiter};
pub use ring::BufferRing;
pub use rules::TILE_SIZE;

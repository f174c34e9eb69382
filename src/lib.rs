// src/lib.rs
//! lifegrid
//!
//! Conway's Game of Life simulated and drawn on the GPU with wgpu. The grid
//! lives in a ring of storage buffers; each frame runs the transition
//! kernel, applies pending user activations, and displays the new
//! generation through a color map, with a bounded number of frames in
//! flight.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod gfx;
pub mod performance;
pub mod simulation;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::LifeApp;
pub use config::LifeConfig;
pub use engine::{FrameOutcome, LifeEngine};
pub use error::{LifeError, Result};
pub use simulation::{ActivationPoint, ActivationQueue, Grid, GridSize};

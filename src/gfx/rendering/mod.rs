// src/gfx/rendering/mod.rs
//! Display pass for the grid

pub mod grid_renderer;

// Re-export main types
pub use grid_renderer::{GridRenderer, QuadVertex};

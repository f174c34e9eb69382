// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles the color map texture sampled by the display pass.

pub mod texture_resource;

// Re-export main types
pub use texture_resource::{default_color_ramp, TextureResource, COLOR_MAP_SIZE};

//! # Graphics Module
//!
//! Everything that talks to wgpu: the device context, the presentation
//! surface, the grid buffer ring, the compute passes and the display pass.
//!
//! ## Architecture Overview
//!
//! - **Context** ([`context`]) - Adapter, device and queue
//! - **Grid Store** ([`grid_store`]) - Rotating grid storage buffers and readback
//! - **Compute** ([`compute`]) - Transition kernel and activation override
//! - **Rendering** ([`rendering`]) - Full-screen quad through the color map
//! - **Resources** ([`resources`]) - The 256x1 color map texture
//! - **Surface** ([`surface`]) - Window surface configuration and frame acquisition
//!
//! Per frame, the compute passes and the display pass are recorded into a
//! single command buffer, so a submitted frame either runs entirely or not
//! at all.

pub mod compute;
pub mod context;
pub mod grid_store;
pub mod rendering;
pub mod resources;
pub mod surface;

// Re-export commonly used types
pub use compute::{ActivationStage, SimulationStage};
pub use context::GpuContext;
pub use grid_store::{GridParams, GridStore};
pub use rendering::GridRenderer;
pub use resources::TextureResource;
pub use surface::DisplaySurface;

//! # Error Types
//!
//! Every failure the engine can report. Construction-time failures (no
//! adapter, pipeline compilation, buffer allocation) are fatal to the session
//! and surface synchronously to the caller; there is no retry path.

use thiserror::Error;

/// Main error type for lifegrid operations
#[derive(Error, Debug)]
pub enum LifeError {
    /// No compute-capable adapter was found
    #[error("No suitable GPU adapter: {0}")]
    NoAdapter(String),

    /// The adapter refused to create a device
    #[error("Device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// The event loop could not be created or failed while running
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The OS refused to create a window
    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    /// The window could not be turned into a wgpu surface
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// A surface error that cannot be recovered by reconfiguring
    #[error("Surface error: {0}")]
    Surface(wgpu::SurfaceError),

    /// Device memory was exhausted while allocating grid resources
    #[error("Allocation of {label} failed: {reason}")]
    Allocation { label: String, reason: String },

    /// A shader module or pipeline failed validation
    #[error("Pipeline '{label}' could not be created: {reason}")]
    Pipeline { label: String, reason: String },

    /// Waiting on the device failed
    #[error("Device wait failed: {0}")]
    DeviceWait(#[from] wgpu::PollError),

    /// Mapping a buffer back to the host failed
    #[error("Readback failed: {0}")]
    Readback(String),

    /// The supplied color map does not have one RGBA entry per cell value
    #[error("Color map must hold {expected} bytes of RGBA data, got {actual}")]
    InvalidColorMap { expected: usize, actual: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for lifegrid operations
pub type Result<T> = std::result::Result<T, LifeError>;

impl LifeError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn allocation(label: impl Into<String>, reason: impl ToString) -> Self {
        Self::Allocation {
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    pub fn pipeline(label: impl Into<String>, reason: impl ToString) -> Self {
        Self::Pipeline {
            label: label.into(),
            reason: reason.to_string(),
        }
    }
}

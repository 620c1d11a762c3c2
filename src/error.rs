//! Errors raised by the render engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A call was rejected without mutating any state.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed construction input, e.g. a palette with a single anchor.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No adapter, no device, or the kernel failed to compile.
    #[error("compute device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A device allocation failed while resizing the output.
    #[error("resource exhausted: {0}")]
    ResourceExhaustion(String),

    /// The kernel dispatch was rejected by the device.
    #[error("kernel dispatch failed: {0}")]
    Dispatch(String),

    #[error("failed to read back the output buffer: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

pub type Result<T> = std::result::Result<T, Error>;

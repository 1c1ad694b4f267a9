//! Error types for the capture/encode pipeline
//!
//! Provides typed errors that library users can match and handle specifically.

use thiserror::Error;

use crate::device::DeviceError;

/// Errors that can occur in the streaming pipeline
///
/// Transient capture errors (broken frames, device timeouts) never surface
/// through this type: the stream loop absorbs them by re-initializing. What
/// remains here are construction and orchestration failures.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The supplied configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The capture device collaborator reported an unrecoverable error
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// The encoder collaborator could not be opened for the current device
    #[error("Encoder open failed: {0}")]
    EncoderOpen(String),

    /// Blank-frame JPEG encoding failed
    #[error("Blank JPEG encoding failed: {0}")]
    BlankJpeg(#[from] image::ImageError),

    /// All pool workers exited while the dispatcher was still running
    #[error("Worker pool disconnected")]
    WorkersGone,

    /// OS thread spawning failed
    #[error("Thread spawn failed: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, StreamError>;

//! Capture-device collaborator contract
//!
//! The pipeline does not own a V4L2 implementation; it drives any device
//! through [`CaptureDevice`]. The trait mirrors the hardware buffer
//! lifecycle: `grab_buffer` leases a buffer out of the driver, and exactly
//! one [`release_buffer`](CaptureDevice::release_buffer) must eventually
//! return it. At any instant a buffer index is held by the driver, by an
//! encoder worker, or by a release mailbox — never two of those.

use std::os::fd::RawFd;

use thiserror::Error;

use crate::frame::{FourCC, Frame};

/// Unrecoverable device failures (open/close/release paths)
#[derive(Error, Debug)]
#[error("{0}")]
pub struct DeviceError(pub String);

/// Why a grab produced no buffer
#[derive(Error, Debug)]
pub enum GrabError {
    /// The driver delivered a corrupt frame; skip it and grab again
    #[error("Broken frame")]
    Broken,

    /// The device stopped producing frames for too long; re-initialize
    #[error("Persistent device timeout")]
    PersistentTimeout,

    /// Any other device error; re-initialize
    #[error("Device error: {0}")]
    Device(String),
}

/// A hardware capture buffer leased out of the device
///
/// `index` is the stable slot in the device's buffer table; `dma_fd` is
/// usable as a DMA-BUF import source when the device was opened with DMA
/// export enabled. `raw` is the frame view for CPU consumers.
#[derive(Debug)]
pub struct HwFrame {
    /// Stable index into the device buffer table
    pub index: usize,

    /// DMA-BUF export descriptor, when available
    pub dma_fd: Option<RawFd>,

    /// Raw frame view (geometry, timestamp, payload)
    pub raw: Frame,
}

/// Per-run device geometry and buffer table
///
/// Re-read after every open; this is the authoritative source for the
/// current capture geometry.
#[derive(Debug, Clone)]
pub struct DeviceRuntime {
    /// Capture width in pixels
    pub width: u32,

    /// Capture height in pixels
    pub height: u32,

    /// Source refresh rate in Hz
    pub hz: f32,

    /// Capture pixel format
    pub format: FourCC,

    /// Bytes per row
    pub stride: u32,

    /// Number of hardware buffers in the table
    pub n_bufs: usize,

    /// Per-buffer DMA-BUF descriptors (indexed like the buffer table)
    pub dma_fds: Vec<Option<RawFd>>,
}

/// Capture device collaborator
///
/// Implementations are internally synchronized: `grab_buffer` runs on the
/// dispatcher thread while `release_buffer` is called from releaser threads
/// (serialized by the pipeline's release guard).
pub trait CaptureDevice: Send + Sync {
    /// Device node path (used for access checks and logging)
    fn path(&self) -> &str;

    /// Desired capture rate in frames per second (0 = device native)
    fn desired_fps(&self) -> u32;

    /// Enable or disable DMA-BUF export before the next open
    fn set_dma_export(&self, enabled: bool);

    /// Open the device and negotiate the capture format
    fn open(&self) -> Result<(), DeviceError>;

    /// Close the device and invalidate the runtime
    fn close(&self);

    /// Current per-run geometry; `None` while closed and before first open
    fn runtime(&self) -> Option<DeviceRuntime>;

    /// Lease the next filled buffer out of the driver
    fn grab_buffer(&self) -> Result<HwFrame, GrabError>;

    /// Return a leased buffer to the driver
    fn release_buffer(&self, hw: HwFrame) -> Result<(), DeviceError>;
}

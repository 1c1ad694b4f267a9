//! Encoder collaborator contract
//!
//! The encoder abstraction configures itself for the currently open device
//! and hands the pipeline one [`EncodeWorker`] per pool slot. Workers are
//! moved onto pool threads and driven there; the pipeline never encodes on
//! the dispatcher thread.

use thiserror::Error;

use crate::device::{CaptureDevice, HwFrame};
use crate::frame::Frame;

/// What kind of encoder backs the worker pool
///
/// Memory-to-memory variants need the capture device to export DMA buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    /// Software JPEG encoding
    Cpu,

    /// Hardware-assisted encoding through a CPU-visible buffer
    Hw,

    /// V4L2 memory-to-memory video encoder
    M2mVideo,

    /// V4L2 memory-to-memory image encoder
    M2mImage,
}

impl EncoderKind {
    /// True for the memory-to-memory variants
    pub fn is_m2m(self) -> bool {
        matches!(self, Self::M2mVideo | Self::M2mImage)
    }
}

/// A single job failed; the pool suppresses the result and carries on
#[derive(Error, Debug)]
#[error("Encode failed: {0}")]
pub struct EncodeError(pub String);

/// One encoder instance, owned by one pool worker thread
pub trait EncodeWorker: Send {
    /// Encode the hardware buffer into `dest`
    ///
    /// `dest` keeps its allocation across jobs; implementations overwrite
    /// payload and format, the pool stamps timestamps.
    fn encode(&mut self, hw: &HwFrame, dest: &mut Frame) -> Result<(), EncodeError>;
}

/// Encoder collaborator
pub trait Encoder: Send + Sync {
    /// Encoder kind, consulted for the DMA-export decision
    fn kind(&self) -> EncoderKind;

    /// Configure for the open device and build one worker per pool slot
    fn open(&self, dev: &dyn CaptureDevice) -> Result<Vec<Box<dyn EncodeWorker>>, EncodeError>;

    /// Tear down after the pool has joined
    fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_m2m_kinds() {
        assert!(EncoderKind::M2mVideo.is_m2m());
        assert!(EncoderKind::M2mImage.is_m2m());
        assert!(!EncoderKind::Cpu.is_m2m());
        assert!(!EncoderKind::Hw.is_m2m());
    }
}

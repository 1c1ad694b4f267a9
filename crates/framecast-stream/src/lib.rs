//! # framecast-stream
//!
//! Capture/encode pipeline core for low-latency MJPEG/H.264 streaming on
//! Linux video-capture hardware.
//!
//! This crate is part of the [framecast](https://github.com/framecast/framecast)
//! workspace. It owns the dispatch machinery between a capture device and
//! its downstream consumers; the V4L2 device itself, the JPEG encoders, the
//! H.264 wrapper and the shared-memory sinks are collaborators plugged in
//! through traits.
//!
//! # Features
//!
//! - **Worker-pool encoding**: N encoder workers driven by a single
//!   dispatcher, with per-worker latency tracking
//! - **Fluency pacing**: grab cadence matched to real encoder throughput
//! - **Leased JPEG ring**: preallocated SPSC ring feeding the HTTP server,
//!   lossy at the producer when consumers lag
//! - **Releaser fan-out**: per-buffer release mailboxes so a slow release
//!   ioctl never stalls the grab path
//! - **Blank fallback**: "< NO SIGNAL >" placeholder with configurable
//!   freeze/blank policy when the capture goes offline
//! - **Idle slowdown**: powers down the loop while nobody is connected and
//!   forces a keyframe for late H.264 subscribers
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use framecast_stream::{Stream, StreamConfig};
//!
//! // `dev` and `enc` implement CaptureDevice and Encoder
//! let config = StreamConfig::builder()
//!     .slowdown(true)
//!     .last_as_blank(2)
//!     .build();
//!
//! let stream = Arc::new(Stream::new(config, dev, enc)?);
//!
//! // The HTTP server consumes JPEG frames from the ring
//! let ring = stream.jpeg_ring();
//!
//! let runner = stream.clone();
//! let handle = std::thread::spawn(move || runner.run());
//!
//! // ... later ...
//! stream.break_loop();
//! handle.join().unwrap()?;
//! # Ok::<(), framecast_stream::StreamError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  grab/release  ┌─────────────────┐
//! │ CaptureDevice│ ◀────────────▶ │   stream loop   │
//! └──────────────┘                └───┬─────────┬───┘
//!                                     │ assign  │ fan-out
//!                                     ▼         ▼
//!                              ┌────────────┐  raw sink,
//!                              │ WorkerPool │  H.264 pipeline
//!                              └─────┬──────┘
//!                                    │ JPEG
//!                                    ▼
//!                          HTTP JPEG ring, JPEG sink
//! ```
//!
//! The pipeline is OS-thread parallel: one dispatcher (the loop itself),
//! N encoder workers, and one releaser thread per device buffer. There is
//! no async runtime.

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod blank;
pub mod clock;
pub mod config;
pub mod device;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod frametext;
pub mod queue;
pub mod ring;
pub mod sink;
pub mod stream;
pub mod workers;

// =============================================================================
// RE-EXPORTS - PRIMARY API
// =============================================================================

// Pipeline (primary entry point)
pub use stream::{Stream, StreamStats};

// Configuration
pub use config::{StreamConfig, StreamConfigBuilder};

// Errors
pub use error::{Result, StreamError};

// Collaborator contracts
pub use device::{CaptureDevice, DeviceError, DeviceRuntime, GrabError, HwFrame};
pub use encoder::{EncodeError, EncodeWorker, Encoder, EncoderKind};
pub use sink::{H264Stream, MemSink};

// Frame types
pub use frame::{FourCC, Frame};

// =============================================================================
// RE-EXPORTS - ADVANCED API
// =============================================================================

// Primitives (exposed for collaborators and tests)
pub use blank::{Blank, NO_SIGNAL_TEXT};
pub use frametext::FrameText;
pub use queue::{GetError, PutError, Queue};
pub use ring::{ConsumerLease, ProducerLease, Ring};
pub use workers::{ReadyWorker, WorkerPool};

// =============================================================================
// CRATE-LEVEL ITEMS
// =============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(StreamConfig::default().validate().is_ok());
    }
}

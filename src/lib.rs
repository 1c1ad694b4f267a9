//! # framecast
//!
//! Capture-and-dispatch core of a low-latency MJPEG/H.264 streamer for
//! Linux video-capture hardware.
//!
//! This crate provides a unified interface to the framecast libraries:
//!
//! - **[`stream`]** - Capture/encode pipeline (worker pool, JPEG ring,
//!   sink fan-out, blank fallback)
//! - **[`drm`]** - KMS/DRM direct-render output with zero-copy DMA
//!   page-flips
//! - **[`audio`]** - ALSA capture and Opus encoding with PTS tracking
//!
//! # Features
//!
//! All features are enabled by default. You can selectively enable only
//! what you need:
//!
//! ```toml
//! # Use everything (default)
//! framecast = "0.1"
//!
//! # Pipeline only
//! framecast = { version = "0.1", default-features = false, features = ["stream"] }
//!
//! # Pipeline + display output
//! framecast = { version = "0.1", default-features = false, features = ["stream", "drm"] }
//! ```
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `stream` | Yes | Capture/encode pipeline |
//! | `drm` | Yes | KMS/DRM display output |
//! | `audio` | Yes | ALSA/Opus audio path |
//! | `full` | No | Everything |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use framecast::stream::{Stream, StreamConfig};
//!
//! // `dev` and `enc` implement the CaptureDevice and Encoder contracts
//! let config = StreamConfig::builder()
//!     .slowdown(true)
//!     .last_as_blank(2)
//!     .build();
//! let stream = Arc::new(Stream::new(config, dev, enc)?);
//!
//! let ring = stream.jpeg_ring(); // consumed by the HTTP server
//!
//! let runner = stream.clone();
//! let handle = std::thread::spawn(move || runner.run());
//! // ... stream.break_loop() to stop ...
//! # Ok::<(), framecast::stream::StreamError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          framecast                              │
//! ├──────────────────────┬──────────────────────┬───────────────────┤
//! │   framecast-stream   │    framecast-drm     │  framecast-audio  │
//! │                      │                      │                   │
//! │  Stream, WorkerPool  │  DrmOutput           │  AudioCapture     │
//! │  Ring, Queue, Blank  │  DisplayMode, Stub   │  EncodedPacket    │
//! │  StreamConfig        │  DrmConfig           │                   │
//! └──────────┬───────────┴──────────┬───────────┴─────────┬─────────┘
//!            │                      │                     │
//!            ▼                      ▼                     ▼
//!      V4L2 capture            KMS/DRM scan-out       ALSA → Opus
//! ```
//!
//! # Platform Support
//!
//! - **Linux only** - V4L2, KMS/DRM and ALSA are kernel interfaces
//! - The capture device, JPEG/H.264 encoders and shared-memory sinks are
//!   collaborators plugged in through the `framecast-stream` traits
//!
//! # Related Crates
//!
//! You can also use the individual crates directly:
//!
//! - [`framecast-stream`](https://crates.io/crates/framecast-stream) - Pipeline only
//! - [`framecast-drm`](https://crates.io/crates/framecast-drm) - Display output only
//! - [`framecast-audio`](https://crates.io/crates/framecast-audio) - Audio only

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// RE-EXPORTS
// =============================================================================

/// Capture/encode pipeline: worker pool, JPEG ring, sinks, blank fallback.
///
/// See [`framecast_stream`] documentation for details.
#[cfg(feature = "stream")]
#[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
pub use framecast_stream as stream;

/// KMS/DRM direct-render output with DMA page-flips.
///
/// See [`framecast_drm`] documentation for details.
#[cfg(feature = "drm")]
#[cfg_attr(docsrs, doc(cfg(feature = "drm")))]
pub use framecast_drm as drm;

/// ALSA capture and Opus encoding.
///
/// See [`framecast_audio`] documentation for details.
#[cfg(feature = "audio")]
#[cfg_attr(docsrs, doc(cfg(feature = "audio")))]
pub use framecast_audio as audio;

// =============================================================================
// PRELUDE - Common types for convenience
// =============================================================================

/// Prelude module with commonly used types.
///
/// ```rust
/// use framecast::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "stream")]
    pub use framecast_stream::{
        CaptureDevice, Encoder, Frame, H264Stream, MemSink, Stream, StreamConfig, StreamError,
    };

    #[cfg(feature = "drm")]
    pub use framecast_drm::{DrmConfig, DrmError, DrmOutput, OpenMode, StubKind};

    #[cfg(feature = "audio")]
    pub use framecast_audio::{AudioCapture, AudioError, EncodedPacket};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    #[cfg(feature = "stream")]
    fn test_stream_reexport() {
        // Just verify the re-export works
        let _ = stream::StreamConfig::default();
    }

    #[test]
    #[cfg(feature = "drm")]
    fn test_drm_reexport() {
        // Just verify the re-export works
        let _ = drm::DrmConfig::default();
    }
}

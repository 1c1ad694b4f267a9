//! # framecast-audio
//!
//! ALSA capture to Opus encoding pipeline for the framecast streamer.
//!
//! This crate is part of the [framecast](https://github.com/framecast/framecast)
//! workspace. It captures PCM periods from an ALSA device, resamples them
//! to the Opus rate when the hardware negotiated something else, encodes
//! 20 ms Opus frames and queues them with 48 kHz-sample presentation
//! timestamps for an RTP sender to poll.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use framecast_audio::AudioCapture;
//!
//! if AudioCapture::probe("hw:1,0") {
//!     let audio = AudioCapture::new("hw:1,0", 48_000)?;
//!     loop {
//!         while let Some(packet) = audio.get_encoded() {
//!             // hand {packet.data, packet.pts} to the RTP sender
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(5));
//!     }
//! }
//! # Ok::<(), framecast_audio::AudioError>(())
//! ```
//!
//! # Threads
//!
//! Construction spawns a capture thread (ALSA period reads into the PCM
//! ring) and an encoder thread (resample, packetize, encode into the
//! encoded ring). Drop stops both, joining the encoder first so it drains
//! before the PCM source disappears.

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod capture;
pub mod error;

mod resample;

// =============================================================================
// RE-EXPORTS - PRIMARY API
// =============================================================================

pub use capture::{AudioCapture, EncodedPacket};
pub use error::{AudioError, Result};

// =============================================================================
// CRATE-LEVEL ITEMS
// =============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

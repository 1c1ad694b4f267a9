//! # framecast-drm
//!
//! Direct-render output for the framecast capture pipeline: composites
//! captured frames (or fallback stub screens) onto a Linux KMS/DRM display
//! via zero-copy DMA page-flips.
//!
//! This crate is part of the [framecast](https://github.com/framecast/framecast)
//! workspace and consumes the frame and device types of
//! [`framecast-stream`](https://crates.io/crates/framecast-stream).
//!
//! # Features
//!
//! - **Zero-copy scan-out**: capture DMA-BUF descriptors imported straight
//!   into framebuffers, no CPU copies on the live path
//! - **Stub screens**: dumb-buffer placeholders ("NO SIGNAL", unsupported
//!   resolution/format, busy) rendered with the shared text rasterizer
//! - **Display supervision**: sysfs connector status checked before every
//!   operation, with one-shot unplug reporting
//! - **Mode selection**: exact-match-first preference chain with a refresh
//!   rate derived from real mode timings
//! - **DPMS handling**: displays power on for exposure and off on request,
//!   tolerant of the disconnect blink DPMS transitions produce
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use framecast_drm::{DrmConfig, DrmOutput, OpenMode, StubKind};
//!
//! let mut output = DrmOutput::new(DrmConfig::default());
//!
//! match output.open(Some(&capture_runtime))? {
//!     OpenMode::Dma => {
//!         // hw: HwFrame leased from the capture device
//!         output.expose_dma(&hw)?;
//!         output.wait_for_vsync()?;
//!     }
//!     OpenMode::Stub(kind) => {
//!         output.expose_stub(kind, Some(&capture_runtime))?;
//!         output.wait_for_vsync()?;
//!     }
//! }
//!
//! output.close();
//! # Ok::<(), framecast_drm::DrmError>(())
//! ```
//!
//! # Page-flip protocol
//!
//! ```text
//! expose_*()            wait_for_vsync()
//!    │                        │
//!    ├─ has_vsync = false     ├─ fast path if has_vsync
//!    ├─ PageFlip(EVENT|ASYNC) ├─ poll(fd, timeout)
//!    │                        ├─ drain events
//!    ▼                        ▼
//!  flip pending ──────▶ PageFlip event: has_vsync = true,
//!                       in-flight DMA descriptor cleared
//! ```
//!
//! A new expose must not be submitted while a flip is pending; callers
//! alternate expose and vsync waits.

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod error;
pub mod modes;
pub mod output;
pub mod stub;

// =============================================================================
// RE-EXPORTS - PRIMARY API
// =============================================================================

pub use error::{DrmError, Result};
pub use output::{DrmConfig, DrmOutput, OpenMode};
pub use stub::{stub_text, StubKind};

// =============================================================================
// RE-EXPORTS - ADVANCED API
// =============================================================================

pub use modes::{find_best_mode, resolution_fits, DisplayMode};

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
    fn test_default_config() {
        let config = DrmConfig::default();
        assert_eq!(config.port, "HDMI-A-1");
    }
}

//! Video frame container
//!
//! [`Frame`] is the heap-owned unit of pixel or bitstream data flowing through
//! the pipeline: ring slots, encoder destinations and sink payloads are all
//! frames. The payload buffer keeps its allocation across reuse, so a
//! preallocated ring slot never reallocates in steady state once it has seen
//! its largest frame.

use std::fmt;

/// Four-character pixel/bitstream format code (V4L2 convention)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub u32);

impl FourCC {
    /// Build a code from its four ASCII characters
    pub const fn from_bytes(b: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(b))
    }

    /// Packed 24-bit RGB
    pub const RGB24: Self = Self::from_bytes(*b"RGB3");

    /// JPEG/JFIF compressed
    pub const JPEG: Self = Self::from_bytes(*b"JPEG");

    /// YUYV 4:2:2
    pub const YUYV: Self = Self::from_bytes(*b"YUYV");

    /// H.264 bitstream
    pub const H264: Self = Self::from_bytes(*b"H264");
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.to_le_bytes() {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Heap-owned copy of encoded or raw pixel data
///
/// Carries the payload plus the geometry and bookkeeping the downstream
/// consumers need: grab timestamp on the shared monotonic axis and the
/// online flag distinguishing live captures from synthetic blanks.
#[derive(Debug, Clone)]
pub struct Frame {
    payload: Vec<u8>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Bytes per row (0 when tightly packed or not applicable)
    pub stride: u32,

    /// Payload format
    pub format: FourCC,

    /// Source refresh rate in Hz (0.0 when unknown)
    pub hz: f32,

    /// Monotonic capture timestamp in seconds
    pub grab_ts: f64,

    /// True for live captures, false for synthetic/dead frames
    pub online: bool,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self {
            payload: Vec::new(),
            width: 0,
            height: 0,
            stride: 0,
            format: FourCC::JPEG,
            hz: 0.0,
            grab_ts: 0.0,
            online: false,
        }
    }

    /// Create an empty frame with a preallocated payload buffer
    pub fn with_capacity(capacity: usize) -> Self {
        let mut frame = Self::new();
        frame.payload.reserve(capacity);
        frame
    }

    /// Used payload length in bytes
    pub fn used(&self) -> usize {
        self.payload.len()
    }

    /// Allocated payload capacity in bytes
    pub fn allocated(&self) -> usize {
        self.payload.capacity()
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Replace the payload, keeping the allocation where possible
    pub fn set_payload(&mut self, data: &[u8]) {
        self.payload.clear();
        self.payload.extend_from_slice(data);
    }

    /// Drop the payload contents (used length becomes 0)
    pub fn clear(&mut self) {
        self.payload.clear();
    }

    /// Copy payload and metadata from another frame into this one
    ///
    /// The destination keeps its own allocation; this is the slot-refill
    /// path for ring producers.
    pub fn copy_from(&mut self, src: &Frame) {
        self.set_payload(&src.payload);
        self.width = src.width;
        self.height = src.height;
        self.stride = src.stride;
        self.format = src.format;
        self.hz = src.hz;
        self.grab_ts = src.grab_ts;
        self.online = src.online;
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_display() {
        assert_eq!(FourCC::RGB24.to_string(), "RGB3");
        assert_eq!(FourCC::JPEG.to_string(), "JPEG");
    }

    #[test]
    fn test_payload_reuse_keeps_allocation() {
        let mut frame = Frame::with_capacity(4096);
        frame.set_payload(&[0u8; 1024]);
        let cap = frame.allocated();
        assert!(cap >= 4096);

        frame.set_payload(&[1u8; 512]);
        assert_eq!(frame.used(), 512);
        assert_eq!(frame.allocated(), cap);
    }

    #[test]
    fn test_copy_from() {
        let mut src = Frame::new();
        src.set_payload(b"jpegdata");
        src.width = 640;
        src.height = 480;
        src.format = FourCC::JPEG;
        src.grab_ts = 1.25;
        src.online = true;

        let mut dst = Frame::new();
        dst.copy_from(&src);
        assert_eq!(dst.payload(), b"jpegdata");
        assert_eq!((dst.width, dst.height), (640, 480));
        assert!(dst.online);
        assert_eq!(dst.grab_ts, 1.25);
    }
}

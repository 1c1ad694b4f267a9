//! Blank "no signal" frame source
//!
//! Keeps a paired RGB24 + JPEG rendition of a fixed placeholder image sized
//! to the current capture geometry. The RGB frame feeds the raw-frame sinks
//! and the H.264 pipeline while the capture is offline; the JPEG feeds the
//! HTTP ring and the JPEG sink.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use tracing::debug;

use crate::error::Result;
use crate::frame::{FourCC, Frame};
use crate::frametext::FrameText;

/// JPEG quality for the blank rendition
const JPEG_QUALITY: u8 = 80;

/// Default placeholder text
pub const NO_SIGNAL_TEXT: &str = "< NO SIGNAL >";

/// Blank-frame source
pub struct Blank {
    ft: FrameText,
    raw: Frame,
    jpeg: Frame,
    key: Option<(String, u32, u32)>,
}

impl Blank {
    /// Create an empty source; call [`draw`](Self::draw) before use
    pub fn new() -> Self {
        let mut jpeg = Frame::new();
        jpeg.format = FourCC::JPEG;
        Self {
            ft: FrameText::new(),
            raw: Frame::new(),
            jpeg,
            key: None,
        }
    }

    /// Render `text` at the given geometry into both renditions
    ///
    /// No-op when text and geometry are unchanged since the last draw.
    pub fn draw(&mut self, text: &str, width: u32, height: u32) -> Result<()> {
        let key = (text.to_owned(), width, height);
        if self.key.as_ref() == Some(&key) {
            return Ok(());
        }

        self.ft.draw(text, width, height);
        self.raw.copy_from(self.ft.frame());
        self.raw.online = false;

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY).encode(
            self.raw.payload(),
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;
        self.jpeg.set_payload(&encoded);
        self.jpeg.width = width;
        self.jpeg.height = height;
        self.jpeg.stride = 0;
        self.jpeg.format = FourCC::JPEG;
        self.jpeg.online = false;

        debug!("Blank frame redrawn: {width}x{height}, jpeg={}B", self.jpeg.used());
        self.key = Some(key);
        Ok(())
    }

    /// RGB24 rendition
    pub fn raw(&self) -> &Frame {
        &self.raw
    }

    /// JPEG rendition
    pub fn jpeg(&self) -> &Frame {
        &self.jpeg
    }
}

impl Default for Blank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_produces_both_renditions() {
        let mut blank = Blank::new();
        blank.draw(NO_SIGNAL_TEXT, 320, 240).expect("draw");

        assert_eq!(blank.raw().format, FourCC::RGB24);
        assert_eq!(blank.raw().used(), 320 * 240 * 3);
        assert!(!blank.raw().online);

        assert_eq!(blank.jpeg().format, FourCC::JPEG);
        assert!(blank.jpeg().used() > 0);
        // JFIF magic
        assert_eq!(&blank.jpeg().payload()[..2], &[0xFF, 0xD8]);
        assert_eq!((blank.jpeg().width, blank.jpeg().height), (320, 240));
    }

    #[test]
    fn test_redraw_same_geometry_is_cached() {
        let mut blank = Blank::new();
        blank.draw(NO_SIGNAL_TEXT, 320, 240).expect("draw");
        let first = blank.jpeg().payload().to_vec();
        blank.draw(NO_SIGNAL_TEXT, 320, 240).expect("draw");
        assert_eq!(blank.jpeg().payload(), &first[..]);
    }

    #[test]
    fn test_geometry_change_rerenders() {
        let mut blank = Blank::new();
        blank.draw(NO_SIGNAL_TEXT, 320, 240).expect("draw");
        blank.draw(NO_SIGNAL_TEXT, 640, 480).expect("draw");
        assert_eq!((blank.raw().width, blank.raw().height), (640, 480));
        assert_eq!(blank.raw().used(), 640 * 480 * 3);
    }
}

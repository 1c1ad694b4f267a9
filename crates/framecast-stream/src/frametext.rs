//! Multi-line text rasterizer for synthetic frames
//!
//! Renders ASCII text centered on an RGB24 canvas using an embedded 8x8
//! bitmap font, scaled by an integer factor so the text block fills a
//! comfortable fraction of the canvas. Both the blank-frame source and the
//! DRM stub renderer draw through this.

use crate::frame::{FourCC, Frame};

const GLYPH_SIZE: u32 = 8;
const BYTES_PER_PIXEL: u32 = 3;

/// Text rasterizer owning its output frame
pub struct FrameText {
    frame: Frame,
    last: Option<(String, u32, u32)>,
}

impl FrameText {
    /// Create a rasterizer with an empty canvas
    pub fn new() -> Self {
        let mut frame = Frame::new();
        frame.format = FourCC::RGB24;
        Self { frame, last: None }
    }

    /// The most recently rendered canvas
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Render `text` centered on a `width` x `height` RGB24 canvas
    ///
    /// Re-renders only when the text or geometry changed since the last
    /// call. Lines are split on `\n` and centered independently.
    pub fn draw(&mut self, text: &str, width: u32, height: u32) {
        let key = (text.to_owned(), width, height);
        if self.last.as_ref() == Some(&key) {
            return;
        }

        let lines: Vec<&str> = text.split('\n').collect();
        let n_rows = lines.len() as u32;
        let n_cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;

        let scale = scale_factor(width, height, n_cols, n_rows);
        let block_h = n_rows * GLYPH_SIZE * scale;
        let base_y = height.saturating_sub(block_h) / 2;

        let canvas_size = (width * height * BYTES_PER_PIXEL) as usize;
        let mut canvas = vec![0u8; canvas_size];

        for (row, line) in lines.iter().enumerate() {
            let line_w = line.chars().count() as u32 * GLYPH_SIZE * scale;
            let base_x = width.saturating_sub(line_w) / 2;
            let y0 = base_y + row as u32 * GLYPH_SIZE * scale;
            for (col, ch) in line.chars().enumerate() {
                let x0 = base_x + col as u32 * GLYPH_SIZE * scale;
                draw_glyph(&mut canvas, width, height, x0, y0, scale, ch);
            }
        }

        self.frame.set_payload(&canvas);
        self.frame.width = width;
        self.frame.height = height;
        self.frame.stride = width * BYTES_PER_PIXEL;
        self.frame.format = FourCC::RGB24;
        self.frame.online = false;
        self.last = Some(key);
    }
}

impl Default for FrameText {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer scale that fits the text block into ~3/4 of the canvas
fn scale_factor(width: u32, height: u32, n_cols: u32, n_rows: u32) -> u32 {
    if n_cols == 0 || n_rows == 0 {
        return 1;
    }
    let fit = (width / (GLYPH_SIZE * n_cols)).min(height / (GLYPH_SIZE * n_rows));
    (fit * 3 / 4).max(1)
}

fn draw_glyph(canvas: &mut [u8], width: u32, height: u32, x0: u32, y0: u32, scale: u32, ch: char) {
    let glyph = glyph_bitmap(ch);
    for (gy, bits) in glyph.iter().enumerate() {
        for gx in 0..GLYPH_SIZE {
            if bits & (1u8 << gx) == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = x0 + gx * scale + sx;
                    let y = y0 + gy as u32 * scale + sy;
                    if x >= width || y >= height {
                        continue;
                    }
                    let off = ((y * width + x) * BYTES_PER_PIXEL) as usize;
                    canvas[off] = 0xFF;
                    canvas[off + 1] = 0xFF;
                    canvas[off + 2] = 0xFF;
                }
            }
        }
    }
}

fn glyph_bitmap(ch: char) -> &'static [u8; 8] {
    let code = ch as u32;
    if (0x20..0x7F).contains(&code) {
        &FONT8X8[(code - 0x20) as usize]
    } else {
        // Unprintable: render as '?'
        &FONT8X8[(b'?' - 0x20) as usize]
    }
}

/// 8x8 bitmap font, ASCII 0x20-0x7E (bit 0 = leftmost pixel of a row)
#[rustfmt::skip]
const FONT8X8: [[u8; 8]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x18, 0x3C, 0x3C, 0x18, 0x18, 0x00, 0x18, 0x00], // '!'
    [0x36, 0x36, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // '"'
    [0x36, 0x36, 0x7F, 0x36, 0x7F, 0x36, 0x36, 0x00], // '#'
    [0x0C, 0x3E, 0x03, 0x1E, 0x30, 0x1F, 0x0C, 0x00], // '$'
    [0x00, 0x63, 0x33, 0x18, 0x0C, 0x66, 0x63, 0x00], // '%'
    [0x1C, 0x36, 0x1C, 0x6E, 0x3B, 0x33, 0x6E, 0x00], // '&'
    [0x06, 0x06, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00], // '\''
    [0x18, 0x0C, 0x06, 0x06, 0x06, 0x0C, 0x18, 0x00], // '('
    [0x06, 0x0C, 0x18, 0x18, 0x18, 0x0C, 0x06, 0x00], // ')'
    [0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00], // '*'
    [0x00, 0x0C, 0x0C, 0x3F, 0x0C, 0x0C, 0x00, 0x00], // '+'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C, 0x06], // ','
    [0x00, 0x00, 0x00, 0x3F, 0x00, 0x00, 0x00, 0x00], // '-'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C, 0x00], // '.'
    [0x60, 0x30, 0x18, 0x0C, 0x06, 0x03, 0x01, 0x00], // '/'
    [0x3E, 0x63, 0x73, 0x7B, 0x6F, 0x67, 0x3E, 0x00], // '0'
    [0x0C, 0x0E, 0x0C, 0x0C, 0x0C, 0x0C, 0x3F, 0x00], // '1'
    [0x1E, 0x33, 0x30, 0x1C, 0x06, 0x33, 0x3F, 0x00], // '2'
    [0x1E, 0x33, 0x30, 0x1C, 0x30, 0x33, 0x1E, 0x00], // '3'
    [0x38, 0x3C, 0x36, 0x33, 0x7F, 0x30, 0x78, 0x00], // '4'
    [0x3F, 0x03, 0x1F, 0x30, 0x30, 0x33, 0x1E, 0x00], // '5'
    [0x1C, 0x06, 0x03, 0x1F, 0x33, 0x33, 0x1E, 0x00], // '6'
    [0x3F, 0x33, 0x30, 0x18, 0x0C, 0x0C, 0x0C, 0x00], // '7'
    [0x1E, 0x33, 0x33, 0x1E, 0x33, 0x33, 0x1E, 0x00], // '8'
    [0x1E, 0x33, 0x33, 0x3E, 0x30, 0x18, 0x0E, 0x00], // '9'
    [0x00, 0x0C, 0x0C, 0x00, 0x00, 0x0C, 0x0C, 0x00], // ':'
    [0x00, 0x0C, 0x0C, 0x00, 0x00, 0x0C, 0x0C, 0x06], // ';'
    [0x18, 0x0C, 0x06, 0x03, 0x06, 0x0C, 0x18, 0x00], // '<'
    [0x00, 0x00, 0x3F, 0x00, 0x00, 0x3F, 0x00, 0x00], // '='
    [0x06, 0x0C, 0x18, 0x30, 0x18, 0x0C, 0x06, 0x00], // '>'
    [0x1E, 0x33, 0x30, 0x18, 0x0C, 0x00, 0x0C, 0x00], // '?'
    [0x3E, 0x63, 0x7B, 0x7B, 0x7B, 0x03, 0x1E, 0x00], // '@'
    [0x0C, 0x1E, 0x33, 0x33, 0x3F, 0x33, 0x33, 0x00], // 'A'
    [0x3F, 0x66, 0x66, 0x3E, 0x66, 0x66, 0x3F, 0x00], // 'B'
    [0x3C, 0x66, 0x03, 0x03, 0x03, 0x66, 0x3C, 0x00], // 'C'
    [0x1F, 0x36, 0x66, 0x66, 0x66, 0x36, 0x1F, 0x00], // 'D'
    [0x7F, 0x46, 0x16, 0x1E, 0x16, 0x46, 0x7F, 0x00], // 'E'
    [0x7F, 0x46, 0x16, 0x1E, 0x16, 0x06, 0x0F, 0x00], // 'F'
    [0x3C, 0x66, 0x03, 0x03, 0x73, 0x66, 0x7C, 0x00], // 'G'
    [0x33, 0x33, 0x33, 0x3F, 0x33, 0x33, 0x33, 0x00], // 'H'
    [0x1E, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // 'I'
    [0x78, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1E, 0x00], // 'J'
    [0x67, 0x66, 0x36, 0x1E, 0x36, 0x66, 0x67, 0x00], // 'K'
    [0x0F, 0x06, 0x06, 0x06, 0x46, 0x66, 0x7F, 0x00], // 'L'
    [0x63, 0x77, 0x7F, 0x7F, 0x6B, 0x63, 0x63, 0x00], // 'M'
    [0x63, 0x67, 0x6F, 0x7B, 0x73, 0x63, 0x63, 0x00], // 'N'
    [0x1C, 0x36, 0x63, 0x63, 0x63, 0x36, 0x1C, 0x00], // 'O'
    [0x3F, 0x66, 0x66, 0x3E, 0x06, 0x06, 0x0F, 0x00], // 'P'
    [0x1E, 0x33, 0x33, 0x33, 0x3B, 0x1E, 0x38, 0x00], // 'Q'
    [0x3F, 0x66, 0x66, 0x3E, 0x36, 0x66, 0x67, 0x00], // 'R'
    [0x1E, 0x33, 0x07, 0x0E, 0x38, 0x33, 0x1E, 0x00], // 'S'
    [0x3F, 0x2D, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // 'T'
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x3F, 0x00], // 'U'
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x1E, 0x0C, 0x00], // 'V'
    [0x63, 0x63, 0x63, 0x6B, 0x7F, 0x77, 0x63, 0x00], // 'W'
    [0x63, 0x63, 0x36, 0x1C, 0x1C, 0x36, 0x63, 0x00], // 'X'
    [0x33, 0x33, 0x33, 0x1E, 0x0C, 0x0C, 0x1E, 0x00], // 'Y'
    [0x7F, 0x63, 0x31, 0x18, 0x4C, 0x66, 0x7F, 0x00], // 'Z'
    [0x1E, 0x06, 0x06, 0x06, 0x06, 0x06, 0x1E, 0x00], // '['
    [0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x40, 0x00], // '\\'
    [0x1E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x1E, 0x00], // ']'
    [0x08, 0x1C, 0x36, 0x63, 0x00, 0x00, 0x00, 0x00], // '^'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF], // '_'
    [0x0C, 0x18, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00], // '`'
    [0x00, 0x00, 0x1E, 0x30, 0x3E, 0x33, 0x6E, 0x00], // 'a'
    [0x07, 0x06, 0x06, 0x3E, 0x66, 0x66, 0x3B, 0x00], // 'b'
    [0x00, 0x00, 0x1E, 0x33, 0x03, 0x33, 0x1E, 0x00], // 'c'
    [0x38, 0x30, 0x30, 0x3E, 0x33, 0x33, 0x6E, 0x00], // 'd'
    [0x00, 0x00, 0x1E, 0x33, 0x3F, 0x03, 0x1E, 0x00], // 'e'
    [0x1C, 0x36, 0x06, 0x0F, 0x06, 0x06, 0x0F, 0x00], // 'f'
    [0x00, 0x00, 0x6E, 0x33, 0x33, 0x3E, 0x30, 0x1F], // 'g'
    [0x07, 0x06, 0x36, 0x6E, 0x66, 0x66, 0x67, 0x00], // 'h'
    [0x0C, 0x00, 0x0E, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // 'i'
    [0x30, 0x00, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1E], // 'j'
    [0x07, 0x06, 0x66, 0x36, 0x1E, 0x36, 0x67, 0x00], // 'k'
    [0x0E, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // 'l'
    [0x00, 0x00, 0x33, 0x7F, 0x7F, 0x6B, 0x63, 0x00], // 'm'
    [0x00, 0x00, 0x1F, 0x33, 0x33, 0x33, 0x33, 0x00], // 'n'
    [0x00, 0x00, 0x1E, 0x33, 0x33, 0x33, 0x1E, 0x00], // 'o'
    [0x00, 0x00, 0x3B, 0x66, 0x66, 0x3E, 0x06, 0x0F], // 'p'
    [0x00, 0x00, 0x6E, 0x33, 0x33, 0x3E, 0x30, 0x78], // 'q'
    [0x00, 0x00, 0x3B, 0x6E, 0x66, 0x06, 0x0F, 0x00], // 'r'
    [0x00, 0x00, 0x3E, 0x03, 0x1E, 0x30, 0x1F, 0x00], // 's'
    [0x08, 0x0C, 0x3E, 0x0C, 0x0C, 0x2C, 0x18, 0x00], // 't'
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x33, 0x6E, 0x00], // 'u'
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x1E, 0x0C, 0x00], // 'v'
    [0x00, 0x00, 0x63, 0x6B, 0x7F, 0x7F, 0x36, 0x00], // 'w'
    [0x00, 0x00, 0x63, 0x36, 0x1C, 0x36, 0x63, 0x00], // 'x'
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x3E, 0x30, 0x1F], // 'y'
    [0x00, 0x00, 0x3F, 0x19, 0x0C, 0x26, 0x3F, 0x00], // 'z'
    [0x38, 0x0C, 0x0C, 0x07, 0x0C, 0x0C, 0x38, 0x00], // '{'
    [0x18, 0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x00], // '|'
    [0x07, 0x0C, 0x0C, 0x38, 0x0C, 0x0C, 0x07, 0x00], // '}'
    [0x6E, 0x3B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // '~'
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_geometry() {
        let mut ft = FrameText::new();
        ft.draw("< NO SIGNAL >", 640, 480);
        let frame = ft.frame();
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert_eq!(frame.stride, 640 * 3);
        assert_eq!(frame.used(), 640 * 480 * 3);
        assert_eq!(frame.format, FourCC::RGB24);
        assert!(!frame.online);
    }

    #[test]
    fn test_some_pixels_are_lit() {
        let mut ft = FrameText::new();
        ft.draw("X", 64, 64);
        let lit = ft.frame().payload().iter().filter(|&&b| b == 0xFF).count();
        assert!(lit > 0);
        // Background dominates
        assert!(lit < ft.frame().used() / 2);
    }

    #[test]
    fn test_text_is_centered() {
        let mut ft = FrameText::new();
        ft.draw("II", 200, 200);
        let frame = ft.frame();
        let width = frame.width as usize;
        let payload = frame.payload();

        let mut min_x = usize::MAX;
        let mut max_x = 0usize;
        for y in 0..frame.height as usize {
            for x in 0..width {
                if payload[(y * width + x) * 3] == 0xFF {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                }
            }
        }
        assert!(min_x < max_x);
        // The cell block is centered; ink is not symmetric inside its cells,
        // so allow up to half a scaled cell of skew.
        let left = min_x;
        let right = width - 1 - max_x;
        assert!((left as i64 - right as i64).abs() <= 48, "left={left} right={right}");
    }

    #[test]
    fn test_redraw_is_cached() {
        let mut ft = FrameText::new();
        ft.draw("A", 64, 64);
        let first = ft.frame().payload().to_vec();
        ft.draw("A", 64, 64);
        assert_eq!(ft.frame().payload(), &first[..]);
    }

    #[test]
    fn test_tiny_canvas_does_not_panic() {
        let mut ft = FrameText::new();
        ft.draw("=== PiKVM ===\n \n< NO SIGNAL >", 16, 8);
        assert_eq!(ft.frame().used(), 16 * 8 * 3);
    }
}

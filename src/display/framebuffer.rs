// Frame Buffer - Stores the reconstructed picture
//
// The buffer covers exactly the visible area of the configured timing
// geometry. Each pixel is stored as three 8-bit channels (RGB888),
// regardless of the color depth used on the wire.

use crate::engine::Rgb;
use std::ops::Range;

/// Bytes per stored pixel
pub const BYTES_PER_PIXEL: usize = 3;

/// Frame buffer for storing reconstructed pixels
///
/// Allocated once at the visible resolution and zero-initialized (black).
/// Pixels are stored row-major as packed RGB triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    /// Visible width in pixels
    width: usize,
    /// Visible height in pixels
    height: usize,
    /// Pixel data as packed RGB triples
    pixels: Vec<u8>,
}

impl Framebuffer {
    /// Create a black frame buffer of the given size
    ///
    /// # Arguments
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * BYTES_PER_PIXEL],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of pixels
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Whether the buffer has no pixels
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        assert!(x < self.width, "X coordinate {} out of bounds", x);
        assert!(y < self.height, "Y coordinate {} out of bounds", y);
        (y * self.width + x) * BYTES_PER_PIXEL
    }

    /// Set a pixel at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        let offset = self.offset(x, y);
        self.pixels[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&color.to_array());
    }

    /// Get a pixel at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> Rgb {
        let offset = self.offset(x, y);
        Rgb::new(
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        )
    }

    /// Fill a horizontal run of pixels on one row
    ///
    /// # Arguments
    /// * `y` - Row index
    /// * `columns` - Column range to fill (end exclusive)
    /// * `color` - Fill color
    ///
    /// # Panics
    /// Panics if the row or the end of the range is out of bounds
    pub fn fill_span(&mut self, y: usize, columns: Range<usize>, color: Rgb) {
        if columns.is_empty() {
            return;
        }
        assert!(
            columns.end <= self.width,
            "Span end {} out of bounds",
            columns.end
        );
        let start = self.offset(columns.start, y);
        let end = start + columns.len() * BYTES_PER_PIXEL;
        let rgb = color.to_array();
        for pixel in self.pixels[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgb);
        }
    }

    /// Clear the frame buffer to a single color
    pub fn clear(&mut self, color: Rgb) {
        let rgb = color.to_array();
        for pixel in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgb);
        }
    }

    /// Packed RGB bytes of one row
    pub fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.height, "Y coordinate {} out of bounds", y);
        let stride = self.width * BYTES_PER_PIXEL;
        &self.pixels[y * stride..(y + 1) * stride]
    }

    /// Raw pixel data as packed RGB triples
    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy pixel data from another frame buffer of the same size
    ///
    /// # Panics
    /// Panics if the dimensions differ
    pub fn copy_from(&mut self, other: &Framebuffer) {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "Frame buffer dimensions differ"
        );
        self.pixels.copy_from_slice(&other.pixels);
    }

    /// Convert the frame buffer to RGBA format for display
    ///
    /// # Arguments
    /// * `output` - Output buffer (must be at least `len() * 4` bytes)
    ///
    /// # Panics
    /// Panics if output buffer is too small
    pub fn to_rgba(&self, output: &mut [u8]) {
        assert!(
            output.len() >= self.len() * 4,
            "Output buffer too small for RGBA conversion"
        );

        for (rgb, rgba) in self
            .pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .zip(output.chunks_exact_mut(4))
        {
            rgba[..3].copy_from_slice(rgb);
            rgba[3] = 0xFF;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framebuffer_creation() {
        let fb = Framebuffer::new(800, 600);
        assert_eq!(fb.len(), 800 * 600);
        assert_eq!(fb.as_slice().len(), 800 * 600 * 3);
        assert!(fb.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_get_pixel() {
        let mut fb = Framebuffer::new(16, 8);
        fb.set_pixel(10, 5, Rgb::new(1, 2, 3));
        assert_eq!(fb.get_pixel(10, 5), Rgb::new(1, 2, 3));
        assert_eq!(fb.get_pixel(9, 5), Rgb::BLACK);
    }

    #[test]
    fn test_fill_span() {
        let mut fb = Framebuffer::new(8, 2);
        let red = Rgb::new(0xFF, 0, 0);
        fb.fill_span(1, 2..5, red);
        assert_eq!(fb.get_pixel(1, 1), Rgb::BLACK);
        assert_eq!(fb.get_pixel(2, 1), red);
        assert_eq!(fb.get_pixel(4, 1), red);
        assert_eq!(fb.get_pixel(5, 1), Rgb::BLACK);
        assert!(fb.row(0).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fill_empty_span_is_noop() {
        let mut fb = Framebuffer::new(4, 1);
        fb.fill_span(0, 3..3, Rgb::new(9, 9, 9));
        assert!(fb.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clear() {
        let mut fb = Framebuffer::new(4, 4);
        fb.clear(Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(fb.get_pixel(0, 0), Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(fb.get_pixel(3, 3), Rgb::new(0x10, 0x20, 0x30));
    }

    #[test]
    fn test_to_rgba() {
        let mut fb = Framebuffer::new(2, 1);
        fb.set_pixel(1, 0, Rgb::new(0xC0, 0x40, 0x00));

        let mut rgba = vec![0u8; 2 * 4];
        fb.to_rgba(&mut rgba);

        assert_eq!(&rgba[..4], &[0, 0, 0, 0xFF]);
        assert_eq!(&rgba[4..], &[0xC0, 0x40, 0x00, 0xFF]);
    }

    #[test]
    fn test_copy_from() {
        let mut source = Framebuffer::new(3, 3);
        source.set_pixel(2, 2, Rgb::new(7, 7, 7));
        let mut target = Framebuffer::new(3, 3);
        target.copy_from(&source);
        assert_eq!(target, source);
    }

    #[test]
    #[should_panic]
    fn test_set_pixel_out_of_bounds_x() {
        let mut fb = Framebuffer::new(4, 4);
        fb.set_pixel(4, 0, Rgb::BLACK);
    }

    #[test]
    #[should_panic]
    fn test_set_pixel_out_of_bounds_y() {
        let mut fb = Framebuffer::new(4, 4);
        fb.set_pixel(0, 4, Rgb::BLACK);
    }

    #[test]
    #[should_panic(expected = "Span end 5 out of bounds")]
    fn test_fill_span_out_of_bounds() {
        let mut fb = Framebuffer::new(4, 1);
        fb.fill_span(0, 2..5, Rgb::BLACK);
    }
}

// Direct-Color Surface - true-color copy of the logical buffer
//
// Pixels are packed 32-bit ARGB words (0xAARRGGBB). Uploaded as bytes on a
// little-endian host they read B, G, R, A, which is the layout the GPU
// stages use for every texture.

use super::framebuffer::IndexedSurface;
use super::palette::Palette;
use crate::error::SurfaceError;

/// Channel layout of a packed 32-bit pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
}

impl PixelFormat {
    /// 32-bit ARGB with 8 bits per channel
    pub const ARGB8888: PixelFormat = PixelFormat {
        r_mask: 0x00FF_0000,
        g_mask: 0x0000_FF00,
        b_mask: 0x0000_00FF,
        a_mask: 0xFF00_0000,
    };

    /// Bytes per pixel
    pub const fn bytes_per_pixel(&self) -> usize {
        4
    }
}

/// True-color surface with a fixed ARGB8888 layout
pub struct DirectColorSurface {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl DirectColorSurface {
    /// Create a surface with every pixel transparent black
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::ARGB8888
    }

    /// Bytes per row
    pub fn pitch(&self) -> usize {
        self.width * PixelFormat::ARGB8888.bytes_per_pixel()
    }

    /// Packed ARGB value at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> u32 {
        assert!(x < self.width && y < self.height, "({}, {}) out of bounds", x, y);
        self.pixels[y * self.width + x]
    }

    /// Packed ARGB pixels, row-major
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel data as raw bytes for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Resolve an indexed surface through `palette`, overwriting every pixel
    ///
    /// Each index is looked up directly; nothing is blended.
    pub fn blit_indexed(
        &mut self,
        src: &IndexedSurface,
        palette: &Palette,
    ) -> Result<(), SurfaceError> {
        if src.width() != self.width || src.height() != self.height {
            return Err(SurfaceError::SizeMismatch {
                src_width: src.width(),
                src_height: src.height(),
                dst_width: self.width,
                dst_height: self.height,
            });
        }

        let table = palette.to_argb_table();
        for (dst, &index) in self.pixels.iter_mut().zip(src.as_slice()) {
            *dst = table[index as usize];
        }
        Ok(())
    }
}

impl std::fmt::Debug for DirectColorSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectColorSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::palette::Color;

    #[test]
    fn test_pitch_and_bytes() {
        let surface = DirectColorSurface::new(10, 3);
        assert_eq!(surface.pitch(), 40);
        assert_eq!(surface.as_bytes().len(), 120);
    }

    #[test]
    fn test_grayscale_round_trip() {
        let palette = Palette::grayscale();
        let mut dst = DirectColorSurface::new(8, 8);
        for i in 0..=255u8 {
            let mut src = IndexedSurface::new(8, 8);
            src.clear(i);
            dst.blit_indexed(&src, &palette).unwrap();
            let expected = Color::rgb(i, i, i).to_argb();
            assert!(dst.pixels().iter().all(|&p| p == expected), "index {}", i);
        }
    }

    #[test]
    fn test_blit_size_mismatch() {
        let src = IndexedSurface::new(4, 4);
        let mut dst = DirectColorSurface::new(4, 5);
        let err = dst.blit_indexed(&src, &Palette::new()).unwrap_err();
        assert!(matches!(err, SurfaceError::SizeMismatch { .. }));
    }

    #[test]
    fn test_bytes_are_bgra_on_little_endian() {
        let mut src = IndexedSurface::new(1, 1);
        src.set_pixel(0, 0, 1);
        let mut colors = [Color::BLACK; 256];
        colors[1] = Color::rgba(0x11, 0x22, 0x33, 0x44);
        let mut dst = DirectColorSurface::new(1, 1);
        dst.blit_indexed(&src, &Palette::from_colors(colors)).unwrap();

        assert_eq!(dst.get_pixel(0, 0), 0x4411_2233);
        if cfg!(target_endian = "little") {
            assert_eq!(dst.as_bytes(), &[0x33, 0x22, 0x11, 0x44]);
        }
    }
}

// Indexed Surface - 8-bit palette-indexed pixel storage
//
// The logical buffer the game renders into is an indexed surface. Each pixel
// is a palette index (0-255); colors come from the palette bound to the
// surface. Auxiliary surfaces use the same type and can be bound to the
// pipeline's palette so that they share its color space.

use super::palette::SharedPalette;
use super::surface::DirectColorSurface;
use crate::error::SurfaceError;

/// Palette-indexed pixel surface
pub struct IndexedSurface {
    width: usize,
    height: usize,
    /// Pixel data stored as palette indices, row-major, pitch == width
    pixels: Vec<u8>,
    palette: Option<SharedPalette>,
}

impl IndexedSurface {
    /// Create an indexed surface with every pixel set to index 0 and no palette bound
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
            palette: None,
        }
    }

    /// Create an indexed surface bound to `palette`
    pub fn with_palette(width: usize, height: usize, palette: SharedPalette) -> Self {
        let mut surface = Self::new(width, height);
        surface.palette = Some(palette);
        surface
    }

    /// Surface width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Surface height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row (one byte per pixel, no padding)
    pub fn pitch(&self) -> usize {
        self.width
    }

    /// Bind a palette to this surface
    pub fn set_palette(&mut self, palette: SharedPalette) {
        self.palette = Some(palette);
    }

    /// The palette bound to this surface, if any
    pub fn palette(&self) -> Option<&SharedPalette> {
        self.palette.as_ref()
    }

    /// Set a pixel at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, index: u8) {
        assert!(x < self.width, "X coordinate {} out of bounds", x);
        assert!(y < self.height, "Y coordinate {} out of bounds", y);

        self.pixels[y * self.width + x] = index;
    }

    /// Get the palette index at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width, "X coordinate {} out of bounds", x);
        assert!(y < self.height, "Y coordinate {} out of bounds", y);

        self.pixels[y * self.width + x]
    }

    /// Fill the surface with one palette index
    pub fn clear(&mut self, index: u8) {
        self.pixels.fill(index);
    }

    /// Raw palette indices
    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to the raw palette indices
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Replace all pixels with `indices`
    ///
    /// # Panics
    /// Panics if `indices` does not hold exactly `width * height` bytes
    pub fn copy_from_slice(&mut self, indices: &[u8]) {
        assert_eq!(
            indices.len(),
            self.pixels.len(),
            "Indexed frame must be exactly {}×{} pixels",
            self.width,
            self.height
        );
        self.pixels.copy_from_slice(indices);
    }

    /// Copy this surface's indices into `dst` with its top-left corner at `(x, y)`
    ///
    /// The copy is clipped against `dst`. Indices are copied verbatim, so
    /// both surfaces are expected to share a palette.
    pub fn blit_to(&self, dst: &mut IndexedSurface, x: i32, y: i32) {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let src_x = (x0 as i64 - x as i64) as usize;
        let src_y = (y0 as i64 - y as i64) as usize;

        if x0 >= dst.width || y0 >= dst.height || src_x >= self.width || src_y >= self.height {
            return;
        }

        let copy_w = (self.width - src_x).min(dst.width - x0);
        let copy_h = (self.height - src_y).min(dst.height - y0);

        for row in 0..copy_h {
            let src_start = (src_y + row) * self.width + src_x;
            let dst_start = (y0 + row) * dst.width + x0;
            dst.pixels[dst_start..dst_start + copy_w]
                .copy_from_slice(&self.pixels[src_start..src_start + copy_w]);
        }
    }

    /// Resolve this surface through its bound palette into `dst`
    pub fn resolve_into(&self, dst: &mut DirectColorSurface) -> Result<(), SurfaceError> {
        let palette = self.palette.as_ref().ok_or(SurfaceError::NoPalette)?;
        dst.blit_indexed(self, &palette.borrow())
    }

    /// Fill the surface with a grid of palette blocks
    pub fn test_pattern(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let index = ((x / 16) + (y / 16) * 16) % 256;
                self.pixels[y * self.width + x] = index as u8;
            }
        }
    }

    /// Fill the surface with a horizontal index gradient
    pub fn gradient_pattern(&mut self) {
        if self.width == 0 {
            return;
        }
        for y in 0..self.height {
            for x in 0..self.width {
                self.pixels[y * self.width + x] = (x * 256 / self.width) as u8;
            }
        }
    }
}

impl std::fmt::Debug for IndexedSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_palette", &self.palette.is_some())
            .finish()
    }
}

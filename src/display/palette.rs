// Color Palette - 256-entry lookup table for indexed surfaces
//
// Every indexed surface resolves its 8-bit pixels through a palette.
// The table always holds exactly 256 entries; updates replace all of them.
//
// The palette is shared between the logical buffer and any auxiliary surface
// bound to it, so a later `set_colors` is visible through every binding.

use std::cell::RefCell;
use std::rc::Rc;

/// Number of entries in a palette
pub const PALETTE_SIZE: usize = 256;

/// A palette shared between the logical buffer and auxiliary surfaces
pub type SharedPalette = Rc<RefCell<Palette>>;

/// One palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Opaque white, the value of every entry in a freshly allocated palette
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    /// Opaque black
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    /// Create a fully opaque color
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Create a color with an explicit alpha channel
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Pack the color as a 32-bit ARGB value (0xAARRGGBB)
    #[inline]
    pub const fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Unpack a 32-bit ARGB value (0xAARRGGBB)
    #[inline]
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }
}

/// 256-entry color lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Color; PALETTE_SIZE],
}

impl Palette {
    /// Create a palette with every entry set to opaque white
    pub fn new() -> Self {
        Self {
            colors: [Color::WHITE; PALETTE_SIZE],
        }
    }

    /// Create a palette from a full table of colors
    pub fn from_colors(colors: [Color; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    /// Create a grayscale palette where entry `i` is `(i, i, i)`
    pub fn grayscale() -> Self {
        let mut colors = [Color::BLACK; PALETTE_SIZE];
        for (i, color) in colors.iter_mut().enumerate() {
            let level = i as u8;
            *color = Color::rgb(level, level, level);
        }
        Self { colors }
    }

    /// Create a palette from packed 8-bit RGB triplets
    ///
    /// # Arguments
    /// * `bytes` - `R, G, B` bytes for each entry in order (up to 768 bytes)
    ///
    /// Entries not covered by `bytes` stay opaque black. Trailing bytes that
    /// do not form a full triplet are ignored.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        let mut colors = [Color::BLACK; PALETTE_SIZE];
        for (color, rgb) in colors.iter_mut().zip(bytes.chunks_exact(3)) {
            *color = Color::rgb(rgb[0], rgb[1], rgb[2]);
        }
        Self { colors }
    }

    /// Replace the whole table
    ///
    /// The update range is always `[0, 256)`.
    pub fn set_colors(&mut self, colors: &[Color; PALETTE_SIZE]) {
        self.colors = *colors;
    }

    /// Look up a palette entry
    #[inline]
    pub fn color(&self, index: u8) -> Color {
        self.colors[index as usize]
    }

    /// Look up a palette entry packed as ARGB
    #[inline]
    pub fn argb(&self, index: u8) -> u32 {
        self.colors[index as usize].to_argb()
    }

    /// All entries in index order
    pub fn colors(&self) -> &[Color; PALETTE_SIZE] {
        &self.colors
    }

    /// Build a 256-entry ARGB lookup table
    pub fn to_argb_table(&self) -> [u32; PALETTE_SIZE] {
        let mut table = [0u32; PALETTE_SIZE];
        for (slot, color) in table.iter_mut().zip(self.colors.iter()) {
            *slot = color.to_argb();
        }
        table
    }

    /// Wrap the palette for sharing between surfaces
    pub fn into_shared(self) -> SharedPalette {
        Rc::new(RefCell::new(self))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_size() {
        let palette = Palette::new();
        assert_eq!(palette.colors().len(), PALETTE_SIZE);
    }

    #[test]
    fn test_new_palette_is_white() {
        let palette = Palette::new();
        assert_eq!(palette.color(0), Color::WHITE);
        assert_eq!(palette.color(255), Color::WHITE);
    }

    #[test]
    fn test_color_to_argb() {
        let color = Color::rgba(0x12, 0x34, 0x56, 0x78);
        assert_eq!(color.to_argb(), 0x7812_3456);
        assert_eq!(Color::from_argb(0x7812_3456), color);
    }

    #[test]
    fn test_grayscale() {
        let palette = Palette::grayscale();
        assert_eq!(palette.color(0), Color::rgb(0, 0, 0));
        assert_eq!(palette.color(0x80), Color::rgb(0x80, 0x80, 0x80));
        assert_eq!(palette.argb(0xFF), 0xFFFF_FFFF);
    }

    #[test]
    fn test_from_rgb_bytes() {
        let palette = Palette::from_rgb_bytes(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(palette.color(0), Color::rgb(1, 2, 3));
        assert_eq!(palette.color(1), Color::rgb(4, 5, 6));
        // Incomplete triplet is ignored
        assert_eq!(palette.color(2), Color::BLACK);
    }

    #[test]
    fn test_set_colors_replaces_everything() {
        let mut palette = Palette::grayscale();
        palette.set_colors(&[Color::rgb(9, 8, 7); PALETTE_SIZE]);
        assert!(palette.colors().iter().all(|&c| c == Color::rgb(9, 8, 7)));
    }

    #[test]
    fn test_argb_table() {
        let table = Palette::grayscale().to_argb_table();
        assert_eq!(table[0x10], 0xFF10_1010);
    }
}

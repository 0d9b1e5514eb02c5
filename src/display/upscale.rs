// Upscale factor computation
//
// The screen texture is an integer multiple of the CRT resolution so that
// nearest-neighbor magnification keeps hard pixel edges. The multiple follows
// the output surface size, bounded by the hardware's maximum texture size and
// by a total pixel budget.

use crate::error::VideoError;

/// Default ceiling on screen texture pixels (4096×2160)
pub const DEFAULT_PIXEL_BUDGET: u64 = 4096 * 2160;

/// Width and height of a surface or texture in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count
    pub const fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// The canonical 4:3 CRT screen for a logical width
    ///
    /// 640×400 becomes 640×480, 320×200 becomes 320×240.
    pub const fn crt_for_logical_width(logical_width: u32) -> Self {
        Self {
            width: logical_width,
            height: (logical_width as u64 * 3 / 4) as u32,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Maximum single-texture dimensions reported by the hardware
///
/// A dimension of 0 means the backend did not report a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureLimits {
    pub max_width: u32,
    pub max_height: u32,
}

impl TextureLimits {
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// No limit on either axis
    pub const UNLIMITED: TextureLimits = TextureLimits::new(0, 0);

    /// Whether a texture of `size` fits these limits
    pub fn fits(&self, size: Resolution) -> bool {
        (self.max_width == 0 || size.width <= self.max_width)
            && (self.max_height == 0 || size.height <= self.max_height)
    }
}

/// Integer multipliers applied to the CRT resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpscaleFactor {
    pub x: u32,
    pub y: u32,
}

impl UpscaleFactor {
    /// No magnification
    pub const ONE: UpscaleFactor = UpscaleFactor { x: 1, y: 1 };

    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Size of the screen texture for a CRT resolution
    pub const fn apply(&self, crt: Resolution) -> Resolution {
        Resolution {
            width: crt.width * self.x,
            height: crt.height * self.y,
        }
    }
}

impl std::fmt::Display for UpscaleFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Compute the screen texture upscale factor
///
/// # Arguments
/// * `output` - Actual pixel size of the presentation surface
/// * `crt` - CRT texture resolution
/// * `limits` - Hardware maximum texture dimensions
/// * `pixel_budget` - Ceiling on `factor.x * factor.y * crt.pixels()`
///
/// The output size is first normalized to the CRT aspect ratio along its
/// shorter axis, then divided (rounding up) by the CRT size. Factors are
/// clamped to the hardware limits, then the larger factor (ties: x) is
/// decremented until the budget is met. Neither factor goes below 1, so a
/// budget smaller than one CRT frame yields 1×1.
///
/// # Errors
/// `UnsatisfiableUpscale` if a reported hardware limit is smaller than the
/// CRT resolution on that axis.
pub fn compute_upscale(
    output: Resolution,
    crt: Resolution,
    limits: TextureLimits,
    pixel_budget: u64,
) -> Result<UpscaleFactor, VideoError> {
    if crt.width == 0 || crt.height == 0 {
        return Err(VideoError::InvalidConfig(format!(
            "CRT resolution {} has a zero dimension",
            crt
        )));
    }

    let out_w = output.width as u64;
    let out_h = output.height as u64;
    let crt_w = crt.width as u64;
    let crt_h = crt.height as u64;

    // Normalized extents as exact fractions (numerator, denominator)
    let (norm_w, norm_h) = if out_w > out_h {
        ((out_h * crt_w, crt_h), (out_h, 1))
    } else {
        ((out_w, 1), (out_w * crt_h, crt_w))
    };

    let mut sx = norm_w.0.div_ceil(norm_w.1 * crt_w).max(1);
    let mut sy = norm_h.0.div_ceil(norm_h.1 * crt_h).max(1);

    let unsatisfiable = || VideoError::UnsatisfiableUpscale {
        max_width: limits.max_width,
        max_height: limits.max_height,
        crt_width: crt.width,
        crt_height: crt.height,
    };

    if limits.max_width > 0 {
        while sx > 0 && sx * crt_w > limits.max_width as u64 {
            sx -= 1;
        }
        if sx == 0 {
            return Err(unsatisfiable());
        }
    }
    if limits.max_height > 0 {
        while sy > 0 && sy * crt_h > limits.max_height as u64 {
            sy -= 1;
        }
        if sy == 0 {
            return Err(unsatisfiable());
        }
    }

    let crt_pixels = crt.pixels();
    while sx * sy * crt_pixels > pixel_budget {
        if sx >= sy {
            if sx == 1 {
                break;
            }
            sx -= 1;
        } else {
            sy -= 1;
        }
    }

    Ok(UpscaleFactor::new(sx as u32, sy as u32))
}

// Software render backend
//
// CPU implementation of the renderer operations. Textures and the output
// surface are plain ARGB buffers; copies sample with pixel-center mapping,
// the same convention GPU samplers use, so nearest copies at integer ratios
// are exact pixel replication.
//
// Used for headless rendering, tests and benchmarks.

use super::{FilterMode, RenderBackend, TextureAccess, TextureDesc};
use crate::display::upscale::{Resolution, TextureLimits};
use crate::error::BackendError;

/// Default maximum texture dimension for the software backend
pub const SOFTWARE_MAX_TEXTURE_SIZE: u32 = 16384;

const OPAQUE_BLACK: u32 = 0xFF00_0000;

/// Handle to a texture owned by a `SoftwareBackend`
#[derive(Debug, PartialEq, Eq)]
pub struct SoftTexture(u32);

impl SoftTexture {
    /// Slot id, unique for the backend's lifetime
    pub fn id(&self) -> u32 {
        self.0
    }
}

struct TextureSlot {
    desc: TextureDesc,
    pixels: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Output,
    Texture(u32),
}

/// In-memory renderer
pub struct SoftwareBackend {
    output_size: Resolution,
    windowed_size: Resolution,
    display_size: Option<Resolution>,
    output: Vec<u32>,
    limits: TextureLimits,
    slots: Vec<Option<TextureSlot>>,
    target: Target,
    fullscreen: bool,
    frames_presented: u64,
}

impl SoftwareBackend {
    /// Create a backend rendering into an output surface of `output_size`
    pub fn new(output_size: Resolution) -> Self {
        Self {
            output_size,
            windowed_size: output_size,
            display_size: None,
            output: vec![OPAQUE_BLACK; output_size.pixels() as usize],
            limits: TextureLimits::new(SOFTWARE_MAX_TEXTURE_SIZE, SOFTWARE_MAX_TEXTURE_SIZE),
            slots: Vec::new(),
            target: Target::Output,
            fullscreen: false,
            frames_presented: 0,
        }
    }

    /// Override the reported maximum texture size
    pub fn with_texture_limits(mut self, limits: TextureLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Size the output surface takes while fullscreen
    pub fn with_display_size(mut self, display_size: Resolution) -> Self {
        self.display_size = Some(display_size);
        self
    }

    /// Output surface pixels (ARGB), row-major
    pub fn output_pixels(&self) -> &[u32] {
        &self.output
    }

    /// One output pixel (ARGB)
    pub fn output_pixel(&self, x: u32, y: u32) -> u32 {
        self.output[(y * self.output_size.width + x) as usize]
    }

    /// Pixels of a live texture
    pub fn texture_pixels(&self, texture: &SoftTexture) -> Option<&[u32]> {
        self.slot(texture.0).ok().map(|slot| slot.pixels.as_slice())
    }

    /// Number of textures created and not yet destroyed
    pub fn live_textures(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of completed `present` calls
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn slot(&self, id: u32) -> Result<&TextureSlot, BackendError> {
        self.slots
            .get(id as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(BackendError::UnknownTexture(id))
    }

    fn slot_mut(&mut self, id: u32) -> Result<&mut TextureSlot, BackendError> {
        self.slots
            .get_mut(id as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(BackendError::UnknownTexture(id))
    }

    /// Take the current target's pixel buffer out, leaving an empty one in place
    fn take_target(&mut self) -> Result<(Vec<u32>, Resolution), BackendError> {
        match self.target {
            Target::Output => Ok((std::mem::take(&mut self.output), self.output_size)),
            Target::Texture(id) => {
                let slot = self.slot_mut(id)?;
                let size = slot.desc.size();
                Ok((std::mem::take(&mut slot.pixels), size))
            }
        }
    }

    fn restore_target(&mut self, pixels: Vec<u32>) -> Result<(), BackendError> {
        match self.target {
            Target::Output => {
                self.output = pixels;
                Ok(())
            }
            Target::Texture(id) => {
                self.slot_mut(id)?.pixels = pixels;
                Ok(())
            }
        }
    }
}

impl RenderBackend for SoftwareBackend {
    type Texture = SoftTexture;

    fn name(&self) -> String {
        "software".to_string()
    }

    fn output_size(&self) -> Resolution {
        self.output_size
    }

    fn max_texture_size(&self) -> TextureLimits {
        self.limits
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<SoftTexture, BackendError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::Texture(format!(
                "texture '{}' has a zero dimension",
                desc.label
            )));
        }
        if !self.limits.fits(desc.size()) {
            return Err(BackendError::TextureTooLarge {
                label: desc.label,
                width: desc.width,
                height: desc.height,
                max_width: self.limits.max_width,
                max_height: self.limits.max_height,
            });
        }

        let id = self.slots.len() as u32;
        self.slots.push(Some(TextureSlot {
            desc: *desc,
            pixels: vec![OPAQUE_BLACK; desc.size().pixels() as usize],
        }));
        Ok(SoftTexture(id))
    }

    fn destroy_texture(&mut self, texture: SoftTexture) {
        if let Some(slot) = self.slots.get_mut(texture.0 as usize) {
            *slot = None;
        }
        if self.target == Target::Texture(texture.0) {
            self.target = Target::Output;
        }
    }

    fn update_texture(
        &mut self,
        texture: &SoftTexture,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<(), BackendError> {
        let slot = self.slot_mut(texture.0)?;
        if slot.desc.access != TextureAccess::Streaming {
            return Err(BackendError::Texture(format!(
                "texture '{}' is not a streaming texture",
                slot.desc.label
            )));
        }

        let width = slot.desc.width as usize;
        let height = slot.desc.height as usize;
        let row_bytes = width * 4;
        let expected = pitch * (height - 1) + row_bytes;
        if pitch < row_bytes || pixels.len() < expected {
            return Err(BackendError::ShortUpload {
                expected,
                actual: pixels.len(),
            });
        }

        for (y, dst_row) in slot.pixels.chunks_exact_mut(width).enumerate() {
            let src_row = &pixels[y * pitch..y * pitch + row_bytes];
            for (dst, texel) in dst_row.iter_mut().zip(src_row.chunks_exact(4)) {
                *dst = u32::from_ne_bytes([texel[0], texel[1], texel[2], texel[3]]);
            }
        }
        Ok(())
    }

    fn set_render_target(&mut self, target: Option<&SoftTexture>) -> Result<(), BackendError> {
        self.target = match target {
            None => Target::Output,
            Some(texture) => {
                let slot = self.slot(texture.0)?;
                if slot.desc.access != TextureAccess::RenderTarget {
                    return Err(BackendError::Texture(format!(
                        "texture '{}' is not a render target",
                        slot.desc.label
                    )));
                }
                Target::Texture(texture.0)
            }
        };
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        match self.target {
            Target::Output => self.output.fill(OPAQUE_BLACK),
            Target::Texture(id) => self.slot_mut(id)?.pixels.fill(OPAQUE_BLACK),
        }
        Ok(())
    }

    fn copy(&mut self, source: &SoftTexture) -> Result<(), BackendError> {
        if self.target == Target::Texture(source.0) {
            return Err(BackendError::SelfCopy(source.0));
        }

        let (mut dst, dst_size) = self.take_target()?;
        let result = self.slot(source.0).map(|src| match src.desc.filter {
            FilterMode::Nearest => scale_nearest(&src.pixels, src.desc.size(), &mut dst, dst_size),
            FilterMode::Linear => scale_linear(&src.pixels, src.desc.size(), &mut dst, dst_size),
        });
        self.restore_target(dst)?;
        result
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.frames_presented += 1;
        Ok(())
    }

    fn resize_output(&mut self, size: Resolution) -> Result<(), BackendError> {
        if !self.fullscreen {
            self.windowed_size = size;
        }
        self.output_size = size;
        self.output = vec![OPAQUE_BLACK; size.pixels() as usize];
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), BackendError> {
        if fullscreen == self.fullscreen {
            return Ok(());
        }
        let size = if fullscreen {
            self.display_size.unwrap_or(self.output_size)
        } else {
            self.windowed_size
        };
        self.fullscreen = fullscreen;
        self.resize_output(size)
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

/// Nearest-neighbour stretch of `src` over all of `dst`
fn scale_nearest(src: &[u32], src_size: Resolution, dst: &mut [u32], dst_size: Resolution) {
    if dst_size.width == 0 || dst_size.height == 0 {
        return;
    }
    let (sw, sh) = (src_size.width as u64, src_size.height as u64);
    let (dw, dh) = (dst_size.width as u64, dst_size.height as u64);

    // Sample at pixel centers: src = floor((dst + 0.5) * s / d)
    let columns: Vec<usize> = (0..dw)
        .map(|dx| ((2 * dx + 1) * sw / (2 * dw)) as usize)
        .collect();

    for (dy, dst_row) in dst.chunks_exact_mut(dw as usize).enumerate() {
        let sy = ((2 * dy as u64 + 1) * sh / (2 * dh)) as usize;
        let src_row = &src[sy * sw as usize..(sy + 1) * sw as usize];
        for (dst, &sx) in dst_row.iter_mut().zip(columns.iter()) {
            *dst = src_row[sx];
        }
    }
}

/// Bilinear stretch of `src` over all of `dst`, clamping at the edges
fn scale_linear(src: &[u32], src_size: Resolution, dst: &mut [u32], dst_size: Resolution) {
    if dst_size.width == 0 || dst_size.height == 0 {
        return;
    }
    let sw = src_size.width as usize;
    let sh = src_size.height as usize;
    let x_ratio = src_size.width as f32 / dst_size.width as f32;
    let y_ratio = src_size.height as f32 / dst_size.height as f32;

    for (dy, dst_row) in dst.chunks_exact_mut(dst_size.width as usize).enumerate() {
        let fy = ((dy as f32 + 0.5) * y_ratio - 0.5).max(0.0);
        let y0 = (fy.floor() as usize).min(sh - 1);
        let y1 = (y0 + 1).min(sh - 1);
        let ty = fy - y0 as f32;

        for (dx, dst) in dst_row.iter_mut().enumerate() {
            let fx = ((dx as f32 + 0.5) * x_ratio - 0.5).max(0.0);
            let x0 = (fx.floor() as usize).min(sw - 1);
            let x1 = (x0 + 1).min(sw - 1);
            let tx = fx - x0 as f32;

            let top = lerp_argb(src[y0 * sw + x0], src[y0 * sw + x1], tx);
            let bottom = lerp_argb(src[y1 * sw + x0], src[y1 * sw + x1], tx);
            *dst = lerp_argb(top, bottom, ty);
        }
    }
}

#[inline]
fn lerp_argb(a: u32, b: u32, t: f32) -> u32 {
    if a == b || t <= 0.0 {
        return a;
    }
    let mut out = 0u32;
    for shift in [0u32, 8, 16, 24] {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        let c = (ca + (cb - ca) * t).round().clamp(0.0, 255.0) as u32;
        out |= c << shift;
    }
    out
}

// Render backend abstraction
//
// The pipeline drives textures through a small immediate-mode renderer API:
// create/destroy/update textures, pick a render target, clear it, copy a
// texture over the whole target, present. The wgpu backend renders to a
// window; the software backend renders into memory.

#[cfg(feature = "gpu")]
pub mod gpu;
pub mod software;

#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;
pub use software::SoftwareBackend;

use super::upscale::{Resolution, TextureLimits};
use crate::error::BackendError;

/// Sampling used when a texture is drawn onto a larger or smaller target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Pixel-accurate, hard edges
    Nearest,
    /// Bilinear blend of neighbouring texels
    Linear,
}

/// How a texture receives its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAccess {
    /// Written from CPU memory every frame
    Streaming,
    /// Rendered into by the backend
    RenderTarget,
}

/// Texture creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    /// Name used in diagnostics
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    /// Filter applied when this texture is the source of a copy
    pub filter: FilterMode,
    pub access: TextureAccess,
}

impl TextureDesc {
    pub fn size(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Renderer operations needed by the presentation pipeline
///
/// All textures are 32 bits per pixel with the byte layout produced by
/// `DirectColorSurface::as_bytes`.
pub trait RenderBackend {
    /// Handle to a texture owned by this backend
    type Texture;

    /// Human-readable backend name for diagnostics
    fn name(&self) -> String;

    /// Current pixel size of the output surface
    fn output_size(&self) -> Resolution;

    /// Maximum single-texture dimensions (0 = not reported)
    fn max_texture_size(&self) -> TextureLimits;

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture, BackendError>;

    /// Release a texture; the handle is consumed
    fn destroy_texture(&mut self, texture: Self::Texture);

    /// Replace the whole contents of a streaming texture
    ///
    /// `pitch` is the number of bytes per source row.
    fn update_texture(
        &mut self,
        texture: &Self::Texture,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<(), BackendError>;

    /// Select the target for subsequent `clear`/`copy` calls
    ///
    /// `None` selects the output surface.
    fn set_render_target(&mut self, target: Option<&Self::Texture>) -> Result<(), BackendError>;

    /// Clear the current render target to opaque black
    fn clear(&mut self) -> Result<(), BackendError>;

    /// Draw `source` stretched over the whole current render target
    ///
    /// The source's own filter mode decides how it is sampled.
    fn copy(&mut self, source: &Self::Texture) -> Result<(), BackendError>;

    /// Show the output surface
    fn present(&mut self) -> Result<(), BackendError>;

    /// Resize the output surface to `size`
    fn resize_output(&mut self, size: Resolution) -> Result<(), BackendError>;

    /// Switch the output between windowed and fullscreen
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), BackendError>;

    /// Whether the output is currently fullscreen
    fn is_fullscreen(&self) -> bool;
}

// Display module - Palette-indexed framebuffer presentation
//
// This module provides:
// - 256-entry palettes shared between indexed surfaces
// - Indexed (8-bit) and direct-color (ARGB) surfaces
// - The upscale factor computation for the screen texture
// - The three-stage texture pipeline and its render backends
// - A winit window driving the pipeline (`gpu` feature)

pub mod backend;
pub mod framebuffer;
pub mod palette;
pub mod pipeline;
pub mod surface;
pub mod upscale;
#[cfg(feature = "gpu")]
pub mod window;

pub use backend::{FilterMode, RenderBackend, SoftwareBackend, TextureAccess, TextureDesc};
#[cfg(feature = "gpu")]
pub use backend::GpuBackend;
pub use framebuffer::IndexedSurface;
pub use palette::{Color, Palette, SharedPalette, PALETTE_SIZE};
pub use pipeline::{Pipeline, PipelineReport};
pub use surface::{DirectColorSurface, PixelFormat};
pub use upscale::{compute_upscale, Resolution, TextureLimits, UpscaleFactor, DEFAULT_PIXEL_BUDGET};
#[cfg(feature = "gpu")]
pub use window::{create_pipeline, run_display, DisplayApp};

// CRT Pipeline Library
// Presentation of palette-indexed framebuffers with CRT aspect correction

// Public modules
pub mod config;
pub mod display;
pub mod error;

// Re-export main types for convenience
pub use config::VideoConfig;
pub use display::{
    compute_upscale, Color, DirectColorSurface, IndexedSurface, Palette, Pipeline,
    PipelineReport, RenderBackend, Resolution, SoftwareBackend, TextureLimits, UpscaleFactor,
};
#[cfg(feature = "gpu")]
pub use display::GpuBackend;
pub use error::{BackendError, SurfaceError, VideoError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_components() {
        // Test that the CPU-side components can be instantiated headless
        let config = VideoConfig::default();
        let backend = SoftwareBackend::new(config.window_size());
        let pipeline = Pipeline::init(backend, &config).unwrap();
        assert_eq!(pipeline.logical().width(), 640);
        assert_eq!(pipeline.direct_color().height(), 400);
    }
}

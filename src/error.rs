// Error types for the presentation pipeline
//
// Every error the pipeline can raise is fatal to presentation; callers
// propagate it to a single top-level handler that tears the pipeline down
// and exits.

use thiserror::Error;

/// Failure reported by a render backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Output window could not be created or reconfigured
    #[error("window error: {0}")]
    Window(String),

    /// No graphics adapter matched the output surface
    #[error("no suitable graphics adapter: {0}")]
    Adapter(String),

    /// The logical device could not be created
    #[error("device request failed: {0}")]
    Device(String),

    /// The output surface could not be created, configured or acquired
    #[error("surface error: {0}")]
    Surface(String),

    /// A texture is larger than the backend allows
    #[error("texture '{label}' ({width}x{height}) exceeds the maximum texture size {max_width}x{max_height}")]
    TextureTooLarge {
        label: &'static str,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    /// A texture could not be created or written
    #[error("texture error: {0}")]
    Texture(String),

    /// A texture handle does not belong to this backend or was already destroyed
    #[error("unknown texture handle {0}")]
    UnknownTexture(u32),

    /// Upload data does not cover the destination texture
    #[error("pixel upload too short: expected {expected} bytes, got {actual}")]
    ShortUpload { expected: usize, actual: usize },

    /// A render target is being used as its own source
    #[error("texture {0} cannot be copied onto itself")]
    SelfCopy(u32),
}

/// Failure while moving pixels between CPU-side surfaces
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// Source and destination dimensions differ
    #[error("surface size mismatch: source {src_width}x{src_height}, destination {dst_width}x{dst_height}")]
    SizeMismatch {
        src_width: usize,
        src_height: usize,
        dst_width: usize,
        dst_height: usize,
    },

    /// The indexed surface has no palette to resolve through
    #[error("indexed surface has no palette bound")]
    NoPalette,
}

/// Fatal pipeline error
#[derive(Debug, Error)]
pub enum VideoError {
    /// A window, surface, buffer or texture could not be created
    #[error("unable to create {resource}: {source}")]
    ResourceCreation {
        resource: &'static str,
        #[source]
        source: BackendError,
    },

    /// The hardware cannot hold even a 1x1 multiple of the CRT resolution
    #[error("unable to fit a {crt_width}x{crt_height} screen texture within the maximum texture size {max_width}x{max_height}")]
    UnsatisfiableUpscale {
        max_width: u32,
        max_height: u32,
        crt_width: u32,
        crt_height: u32,
    },

    /// A GPU operation failed while rendering a frame
    #[error("frame rendering failed during {stage}: {source}")]
    FrameRender {
        stage: &'static str,
        #[source]
        source: BackendError,
    },

    /// Palette resolution into the direct-color surface failed
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    /// The requested configuration cannot describe a pipeline
    #[error("invalid video configuration: {0}")]
    InvalidConfig(String),

    /// The pipeline's textures have already been released
    #[error("pipeline resources have been released")]
    Destroyed,
}

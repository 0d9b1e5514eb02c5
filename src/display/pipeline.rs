// Presentation pipeline - indexed framebuffer to output surface
//
// Owns every stage between the game's 8-bit logical buffer and the visible
// output:
//
//   logical (indexed) --palette--> direct color --upload--> intermediate
//     --nearest--> CRT (4:3) --nearest--> screen (integer multiple)
//     --linear--> output surface
//
// The CRT stage stretches the logical height to a 4:3 screen the way a
// period monitor did. The screen stage magnifies by whole pixels so that the
// final linear pass to an arbitrary output size only softens the outermost
// edge of each pixel.

use super::backend::{FilterMode, RenderBackend, TextureAccess, TextureDesc};
use super::framebuffer::IndexedSurface;
use super::palette::{Color, Palette, SharedPalette, PALETTE_SIZE};
use super::surface::DirectColorSurface;
use super::upscale::{compute_upscale, Resolution, TextureLimits, UpscaleFactor};
use crate::config::VideoConfig;
use crate::error::{BackendError, VideoError};
use std::fmt;

/// Stage names carried by `VideoError::FrameRender`
pub mod stage {
    pub const UPLOAD: &str = "intermediate upload";
    pub const ASPECT: &str = "aspect correction";
    pub const UPSCALE: &str = "integer upscale";
    pub const OUTPUT: &str = "output scaling";
    pub const PRESENT: &str = "present";
}

/// Texture labels, also used as the `resource` of creation errors
pub mod resource {
    pub const OUTPUT: &str = "output surface";
    pub const INTERMEDIATE: &str = "intermediate texture";
    pub const CRT: &str = "CRT texture";
    pub const SCREEN: &str = "screen texture";
}

fn frame_error(stage: &'static str) -> impl FnOnce(BackendError) -> VideoError {
    move |source| VideoError::FrameRender { stage, source }
}

fn creation_error(resource: &'static str) -> impl FnOnce(BackendError) -> VideoError {
    move |source| VideoError::ResourceCreation { resource, source }
}

/// Snapshot of the pipeline's sizes for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub backend: String,
    pub logical: Resolution,
    pub crt: Resolution,
    pub screen: Resolution,
    pub factor: UpscaleFactor,
    pub output: Resolution,
    pub max_texture: TextureLimits,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: logical {} -> CRT {} -> screen {} ({}) -> output {}",
            self.backend, self.logical, self.crt, self.screen, self.factor, self.output
        )?;
        if self.max_texture != TextureLimits::UNLIMITED {
            write!(
                f,
                " [max texture {}x{}]",
                self.max_texture.max_width, self.max_texture.max_height
            )?;
        }
        Ok(())
    }
}

/// The presentation pipeline and every resource it owns
pub struct Pipeline<B: RenderBackend> {
    backend: B,
    palette: SharedPalette,
    logical: IndexedSurface,
    direct: DirectColorSurface,
    crt: Resolution,
    pixel_budget: u64,
    factor: UpscaleFactor,
    // Creation order; released in reverse
    intermediate: Option<B::Texture>,
    crt_texture: Option<B::Texture>,
    screen: Option<B::Texture>,
}

impl<B: RenderBackend> Pipeline<B> {
    /// Build every pipeline stage on top of an output backend
    ///
    /// Creation order: palette and logical buffer, direct-color buffer,
    /// intermediate texture, CRT texture, screen texture. The upscale factor
    /// is computed before the first texture. If any step fails
    /// the resources created so far are released in reverse order before the
    /// error is returned.
    ///
    /// # Errors
    /// * `InvalidConfig` - the configuration fails `VideoConfig::validate`
    /// * `ResourceCreation` - a texture or the fullscreen switch failed
    /// * `UnsatisfiableUpscale` - the hardware cannot hold the CRT resolution
    pub fn init(mut backend: B, config: &VideoConfig) -> Result<Self, VideoError> {
        config.validate()?;

        if config.fullscreen && !backend.is_fullscreen() {
            backend
                .set_fullscreen(true)
                .map_err(creation_error(resource::OUTPUT))?;
        }

        log::info!("Video backend: {}", backend.name());

        let logical = config.logical_resolution();
        let crt = config.crt_resolution();
        let palette = Palette::new().into_shared();

        let mut pipeline = Self {
            logical: IndexedSurface::with_palette(
                logical.width as usize,
                logical.height as usize,
                palette.clone(),
            ),
            direct: DirectColorSurface::new(logical.width as usize, logical.height as usize),
            palette,
            crt,
            pixel_budget: config.pixel_budget,
            factor: UpscaleFactor::ONE,
            intermediate: None,
            crt_texture: None,
            screen: None,
            backend,
        };

        // Checked before any texture exists so hardware that cannot hold the
        // CRT resolution reports its limits rather than a creation failure
        pipeline.factor = pipeline.compute_factor()?;

        let intermediate = pipeline
            .backend
            .create_texture(&TextureDesc {
                label: resource::INTERMEDIATE,
                width: logical.width,
                height: logical.height,
                filter: FilterMode::Nearest,
                access: TextureAccess::Streaming,
            })
            .map_err(creation_error(resource::INTERMEDIATE))?;
        pipeline.intermediate = Some(intermediate);

        let crt_texture = pipeline
            .backend
            .create_texture(&TextureDesc {
                label: resource::CRT,
                width: crt.width,
                height: crt.height,
                filter: FilterMode::Nearest,
                access: TextureAccess::RenderTarget,
            })
            .map_err(creation_error(resource::CRT))?;
        pipeline.crt_texture = Some(crt_texture);

        pipeline.screen = Some(pipeline.create_screen_texture()?);

        log::info!(
            "Logical {} -> CRT {} -> screen {} (upscale {})",
            logical,
            crt,
            pipeline.screen_resolution(),
            pipeline.factor
        );

        Ok(pipeline)
    }

    fn compute_factor(&self) -> Result<UpscaleFactor, VideoError> {
        compute_upscale(
            self.backend.output_size(),
            self.crt,
            self.backend.max_texture_size(),
            self.pixel_budget,
        )
    }

    fn create_screen_texture(&mut self) -> Result<B::Texture, VideoError> {
        let size = self.factor.apply(self.crt);
        self.backend
            .create_texture(&TextureDesc {
                label: resource::SCREEN,
                width: size.width,
                height: size.height,
                filter: FilterMode::Linear,
                access: TextureAccess::RenderTarget,
            })
            .map_err(creation_error(resource::SCREEN))
    }

    /// Render the logical buffer to the output and present it
    ///
    /// # Errors
    /// `FrameRender` naming the failing stage, or `Destroyed` after `destroy`.
    pub fn present_frame(&mut self) -> Result<(), VideoError> {
        self.blit_logical_to_direct_color()?;

        let (Some(intermediate), Some(crt), Some(screen)) = (
            self.intermediate.as_ref(),
            self.crt_texture.as_ref(),
            self.screen.as_ref(),
        ) else {
            return Err(VideoError::Destroyed);
        };
        let backend = &mut self.backend;

        backend
            .update_texture(intermediate, self.direct.as_bytes(), self.direct.pitch())
            .map_err(frame_error(stage::UPLOAD))?;

        backend
            .set_render_target(Some(crt))
            .and_then(|_| backend.clear())
            .and_then(|_| backend.copy(intermediate))
            .map_err(frame_error(stage::ASPECT))?;

        backend
            .set_render_target(Some(screen))
            .and_then(|_| backend.clear())
            .and_then(|_| backend.copy(crt))
            .map_err(frame_error(stage::UPSCALE))?;

        backend
            .set_render_target(None)
            .and_then(|_| backend.clear())
            .and_then(|_| backend.copy(screen))
            .map_err(frame_error(stage::OUTPUT))?;

        backend.present().map_err(frame_error(stage::PRESENT))
    }

    /// Resolve the logical buffer through the palette into the direct-color buffer
    pub fn blit_logical_to_direct_color(&mut self) -> Result<(), VideoError> {
        let palette = self.palette.borrow();
        self.direct.blit_indexed(&self.logical, &palette)?;
        Ok(())
    }

    /// Replace the whole palette
    pub fn set_palette(&mut self, colors: &[Color; PALETTE_SIZE]) {
        self.palette.borrow_mut().set_colors(colors);
    }

    /// Bind `surface` to the pipeline's palette
    ///
    /// Later `set_palette` calls are visible through the surface.
    pub fn bind_palette(&self, surface: &mut IndexedSurface) {
        surface.set_palette(self.palette.clone());
    }

    /// The shared palette
    pub fn palette(&self) -> &SharedPalette {
        &self.palette
    }

    /// The logical buffer
    pub fn logical(&self) -> &IndexedSurface {
        &self.logical
    }

    /// The logical buffer, for the renderer to draw into
    pub fn logical_mut(&mut self) -> &mut IndexedSurface {
        &mut self.logical
    }

    /// The direct-color buffer as of the last resolve
    pub fn direct_color(&self) -> &DirectColorSurface {
        &self.direct
    }

    /// Recompute the upscale factor for the current output size
    ///
    /// Only the screen texture is recreated, and only if the factor changed.
    /// An output with a zero dimension (minimized window) is ignored.
    ///
    /// # Returns
    /// `true` if the screen texture was recreated
    pub fn resize(&mut self) -> Result<bool, VideoError> {
        let output = self.backend.output_size();
        if output.width == 0 || output.height == 0 {
            return Ok(false);
        }
        if self.screen.is_none() {
            return Err(VideoError::Destroyed);
        }

        let factor = self.compute_factor()?;
        if factor == self.factor {
            return Ok(false);
        }

        if let Some(old) = self.screen.take() {
            self.backend.destroy_texture(old);
        }
        self.factor = factor;
        self.screen = Some(self.create_screen_texture()?);

        log::info!(
            "Output resized to {}: screen {} (upscale {})",
            output,
            self.screen_resolution(),
            factor
        );
        Ok(true)
    }

    /// Resize the output surface to `size` and follow it with the screen texture
    pub fn handle_resize(&mut self, size: Resolution) -> Result<bool, VideoError> {
        self.backend
            .resize_output(size)
            .map_err(creation_error(resource::OUTPUT))?;
        self.resize()
    }

    /// Switch between windowed and borderless fullscreen output
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), VideoError> {
        if fullscreen == self.backend.is_fullscreen() {
            return Ok(());
        }
        self.backend
            .set_fullscreen(fullscreen)
            .map_err(creation_error(resource::OUTPUT))?;
        log::debug!("Fullscreen {}", if fullscreen { "on" } else { "off" });
        self.resize().map(|_| ())
    }

    /// Flip between windowed and fullscreen output
    pub fn toggle_fullscreen(&mut self) -> Result<(), VideoError> {
        let fullscreen = !self.backend.is_fullscreen();
        self.set_fullscreen(fullscreen)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.backend.is_fullscreen()
    }

    /// The CRT stage texture, until `destroy`
    pub fn crt_texture(&self) -> Option<&B::Texture> {
        self.crt_texture.as_ref()
    }

    /// The screen stage texture, until `destroy`
    pub fn screen_texture(&self) -> Option<&B::Texture> {
        self.screen.as_ref()
    }

    /// Current screen texture multiplier
    pub fn upscale_factor(&self) -> UpscaleFactor {
        self.factor
    }

    /// CRT texture size
    pub fn crt_resolution(&self) -> Resolution {
        self.crt
    }

    /// Screen texture size
    pub fn screen_resolution(&self) -> Resolution {
        self.factor.apply(self.crt)
    }

    /// Current sizes of every stage
    pub fn report(&self) -> PipelineReport {
        PipelineReport {
            backend: self.backend.name(),
            logical: Resolution::new(self.logical.width() as u32, self.logical.height() as u32),
            crt: self.crt,
            screen: self.screen_resolution(),
            factor: self.factor,
            output: self.backend.output_size(),
            max_texture: self.backend.max_texture_size(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Whether the GPU textures are still held
    pub fn is_live(&self) -> bool {
        self.intermediate.is_some() || self.crt_texture.is_some() || self.screen.is_some()
    }

    /// Release all textures in reverse creation order
    ///
    /// Safe to call any number of times; each texture is released once.
    pub fn destroy(&mut self) {
        if !self.is_live() {
            return;
        }
        for texture in [
            self.screen.take(),
            self.crt_texture.take(),
            self.intermediate.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.backend.destroy_texture(texture);
        }
        log::debug!("Pipeline textures released");
    }
}

impl<B: RenderBackend> Drop for Pipeline<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

// Window module - Drives the pipeline from a winit event loop
//
// Creates the GPU backend and the pipeline once the event loop is running,
// forwards resize and fullscreen requests between frames, and paces frame
// presentation. A demo test pattern with palette cycling stands in for the
// game renderer.

use super::backend::gpu::{GpuBackend, WindowOptions};
use super::palette::{Color, PALETTE_SIZE};
use super::pipeline::{resource, Pipeline};
use super::upscale::Resolution;
use crate::config::VideoConfig;
use crate::error::VideoError;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::WindowId;

/// Create the output window, the renderer and every pipeline stage
///
/// # Errors
/// `ResourceCreation` if the window or renderer cannot be created, otherwise
/// whatever `Pipeline::init` reports.
pub fn create_pipeline(
    event_loop: &ActiveEventLoop,
    config: &VideoConfig,
) -> Result<Pipeline<GpuBackend>, VideoError> {
    config.validate()?;

    let options = WindowOptions {
        title: config.title.clone(),
        size: config.window_size(),
        fullscreen: config.fullscreen,
        vsync: config.vsync,
    };
    let backend =
        GpuBackend::new(event_loop, &options).map_err(|source| VideoError::ResourceCreation {
            resource: resource::OUTPUT,
            source,
        })?;

    Pipeline::init(backend, config)
}

/// Palette used by the demo pattern: a hue wheel with a gray ramp in the last 32 entries
pub fn demo_palette() -> [Color; PALETTE_SIZE] {
    let mut colors = [Color::BLACK; PALETTE_SIZE];
    for (i, color) in colors.iter_mut().enumerate() {
        *color = if i >= 224 {
            let level = ((i - 224) * 255 / 31) as u8;
            Color::rgb(level, level, level)
        } else {
            hue(i as u32 * 1536 / 224)
        };
    }
    colors
}

/// Fully saturated color at `position` on a 0-1535 hue wheel
fn hue(position: u32) -> Color {
    let ramp = (position % 256) as u8;
    match position / 256 {
        0 => Color::rgb(255, ramp, 0),
        1 => Color::rgb(255 - ramp, 255, 0),
        2 => Color::rgb(0, 255, ramp),
        3 => Color::rgb(0, 255 - ramp, 255),
        4 => Color::rgb(ramp, 0, 255),
        _ => Color::rgb(255, 0, 255 - ramp),
    }
}

/// Display application for the presentation pipeline
pub struct DisplayApp {
    config: VideoConfig,
    pipeline: Option<Pipeline<GpuBackend>>,
    palette: [Color; PALETTE_SIZE],
    modifiers: ModifiersState,
    last_frame_time: Instant,
    frames: u64,
    error: Option<VideoError>,
}

impl DisplayApp {
    /// Create the application (the window is created when the event loop starts)
    pub fn new(config: VideoConfig) -> Self {
        Self {
            config,
            pipeline: None,
            palette: demo_palette(),
            modifiers: ModifiersState::empty(),
            last_frame_time: Instant::now(),
            frames: 0,
            error: None,
        }
    }

    /// Take the fatal error that stopped the event loop, if any
    pub fn take_error(&mut self) -> Option<VideoError> {
        self.error.take()
    }

    /// Record a fatal error, release the pipeline and stop the event loop
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: VideoError) {
        log::error!("{}", err);
        self.error = Some(err);
        self.pipeline = None;
        event_loop.exit();
    }

    /// Check if enough time has passed for the next frame
    fn should_render_frame(&mut self) -> bool {
        let elapsed = self.last_frame_time.elapsed();
        if elapsed >= self.config.frame_duration() {
            self.last_frame_time = Instant::now();
            true
        } else {
            false
        }
    }

    /// Advance the demo animation and present one frame
    fn render(&mut self) -> Result<(), VideoError> {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Ok(());
        };

        // Cycle the hue wheel; the gray ramp stays put
        self.palette[..224].rotate_left(1);
        pipeline.set_palette(&self.palette);
        pipeline.present_frame()?;

        self.frames += 1;
        if self.frames % 600 == 0 {
            log::debug!("{} frames presented", self.frames);
        }
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        let toggle = code == KeyCode::F11 || (code == KeyCode::Enter && self.modifiers.alt_key());
        if toggle {
            if let Some(pipeline) = self.pipeline.as_mut() {
                if let Err(err) = pipeline.toggle_fullscreen() {
                    self.fail(event_loop, err);
                }
            }
        } else if code == KeyCode::Escape {
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for DisplayApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.pipeline.is_some() || self.error.is_some() {
            return;
        }

        match create_pipeline(event_loop, &self.config) {
            Ok(mut pipeline) => {
                pipeline.logical_mut().test_pattern();
                log::info!("{}", pipeline.report());
                pipeline.backend().window().request_redraw();
                self.pipeline = Some(pipeline);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(pipeline) = self.pipeline.as_mut() {
                    if let Err(err) =
                        pipeline.handle_resize(Resolution::new(size.width, size.height))
                    {
                        self.fail(event_loop, err);
                    }
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::RedrawRequested => {
                let minimized = self
                    .pipeline
                    .as_ref()
                    .and_then(|pipeline| pipeline.backend().window().is_minimized())
                    .unwrap_or(false);

                if !minimized && self.should_render_frame() {
                    if let Err(err) = self.render() {
                        self.fail(event_loop, err);
                        return;
                    }
                }

                if let Some(pipeline) = &self.pipeline {
                    pipeline.backend().window().request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(pipeline) = &self.pipeline {
            pipeline.backend().window().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.destroy();
        }
    }
}

/// Create the window and run the pipeline until the window closes
///
/// # Returns
/// The fatal error that stopped presentation, if any. The pipeline has been
/// torn down by the time this returns.
pub fn run_display(config: VideoConfig) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;

    // Set control flow based on VSync setting
    if config.vsync {
        event_loop.set_control_flow(ControlFlow::Wait);
    } else {
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    log::info!(
        "Starting display: logical {}, CRT {}, window {}, {} FPS, VSync {}",
        config.logical_resolution(),
        config.crt_resolution(),
        config.window_size(),
        config.target_fps,
        config.vsync
    );

    let mut app = DisplayApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.take_error() {
        Some(err) => Err(Box::new(err)),
        None => Ok(()),
    }
}

// Configuration management
//
// Video settings for the presentation pipeline and their persistence as TOML.

use crate::display::upscale::{Resolution, DEFAULT_PIXEL_BUDGET};
use crate::error::VideoError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Default configuration file path
pub const CONFIG_FILE: &str = "video_config.toml";

/// Video configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Window title
    pub title: String,

    /// Logical framebuffer width in pixels
    pub logical_width: u32,

    /// Logical framebuffer height in pixels
    pub logical_height: u32,

    /// Start in borderless fullscreen
    pub fullscreen: bool,

    /// Wait for vertical blank when presenting
    pub vsync: bool,

    /// Initial window size as a multiple of the CRT resolution (1-8)
    pub window_scale: u32,

    /// Frame rate of the demo loop
    pub target_fps: u32,

    /// Maximum number of pixels in the screen texture
    pub pixel_budget: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            title: "crt-pipeline".to_string(),
            logical_width: 640,
            logical_height: 400,
            fullscreen: false,
            vsync: true,
            window_scale: 2,
            target_fps: 70,
            pixel_budget: DEFAULT_PIXEL_BUDGET,
        }
    }
}

impl VideoConfig {
    /// Create a configuration with default values
    ///
    /// Default: 640×400 logical, windowed at 2x, VSync on, 70 FPS
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the logical framebuffer size
    pub fn with_logical_size(mut self, width: u32, height: u32) -> Self {
        self.logical_width = width;
        self.logical_height = height;
        self
    }

    /// Start fullscreen or windowed
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    /// Set VSync enabled or disabled
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set the initial window scale
    pub fn with_window_scale(mut self, scale: u32) -> Self {
        self.window_scale = scale.clamp(1, 8);
        self
    }

    /// Set the target frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    /// Set the screen texture pixel budget
    pub fn with_pixel_budget(mut self, budget: u64) -> Self {
        self.pixel_budget = budget;
        self
    }

    /// Size of the logical framebuffer
    pub fn logical_resolution(&self) -> Resolution {
        Resolution::new(self.logical_width, self.logical_height)
    }

    /// Size of the CRT texture (4:3 at the logical width)
    pub fn crt_resolution(&self) -> Resolution {
        Resolution::crt_for_logical_width(self.logical_width)
    }

    /// Initial inner window size
    pub fn window_size(&self) -> Resolution {
        let crt = self.crt_resolution();
        let scale = self.window_scale.max(1);
        Resolution::new(crt.width * scale, crt.height * scale)
    }

    /// Get the frame duration for the target FPS
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.target_fps.max(1) as u64)
    }

    /// Check that the configuration describes a usable pipeline
    ///
    /// # Errors
    /// `InvalidConfig` for a zero logical size, a logical width too narrow
    /// for a 4:3 CRT height, or a zero frame rate.
    pub fn validate(&self) -> Result<(), VideoError> {
        if self.logical_width == 0 || self.logical_height == 0 {
            return Err(VideoError::InvalidConfig(format!(
                "logical size {}x{} has a zero dimension",
                self.logical_width, self.logical_height
            )));
        }
        if self.crt_resolution().height == 0 {
            return Err(VideoError::InvalidConfig(format!(
                "logical width {} is too small for a 4:3 CRT screen",
                self.logical_width
            )));
        }
        if self.target_fps == 0 {
            return Err(VideoError::InvalidConfig(
                "target_fps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from file or create default
    ///
    /// If the file cannot be read, the default configuration is written to
    /// `path` (best effort) and returned.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use crt_pipeline::config::{VideoConfig, CONFIG_FILE};
    ///
    /// let config = VideoConfig::load_or_default(CONFIG_FILE);
    /// ```
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::info!("Could not load video config ({}), using defaults", e);
            let config = Self::default();
            if let Err(e) = config.save(&path) {
                log::warn!("Could not save default video config: {}", e);
            }
            config
        })
    }

    /// Load configuration from a TOML file
    ///
    /// Missing fields take their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), io::Error> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)
    }
}

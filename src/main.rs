// CRT Pipeline - Main Entry Point
//
// Opens a window and presents a palette-cycling test pattern through the
// full pipeline. F11 or Alt+Enter toggles fullscreen, Escape quits.

use crt_pipeline::config::{VideoConfig, CONFIG_FILE};
use crt_pipeline::display::run_display;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("crt-pipeline v{}", env!("CARGO_PKG_VERSION"));

    let config = VideoConfig::load_or_default(CONFIG_FILE);
    log::info!("Video configuration loaded from '{}'", CONFIG_FILE);

    // The pipeline is torn down inside run_display before a fatal error reaches here
    if let Err(err) = run_display(config) {
        log::error!("Fatal: {}", err);
        return Err(err);
    }

    log::info!("Display window closed.");
    Ok(())
}

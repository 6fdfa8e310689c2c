//! Triangle demo application
//!
//! Opens an 800x600 window, brings up Vulkan and draws a static triangle
//! until the window is closed. Settings come from `hello.toml` when it
//! exists, otherwise the defaults apply.

use std::error::Error;
use std::process::ExitCode;

use hello_vulkan::foundation::logging;
use hello_vulkan::prelude::*;

/// Optional settings file, read from the working directory
const CONFIG_FILE: &str = "hello.toml";

fn run() -> Result<u64, Box<dyn Error>> {
    let config = RendererConfig::load_or_default(CONFIG_FILE)?;

    log::info!("Creating window...");
    let window = Window::new(config.window.width, config.window.height)?;
    let (width, height) = window.framebuffer_size();
    log::info!("Window created ({}x{} framebuffer)", width, height);

    log::info!(
        "Loading shaders from {} and {}",
        config.shaders.vertex_shader_path,
        config.shaders.fragment_shader_path
    );

    let backend = AshBackend::new()?;
    let mut renderer = VulkanRenderer::bootstrap(backend, window, &config, &config.shaders)?;

    let frames = renderer.run()?;
    Ok(frames)
}

fn main() -> ExitCode {
    logging::init();
    log::info!("Starting triangle demo");

    match run() {
        Ok(frames) => {
            log::info!("Exiting cleanly after {} frames", frames);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                log::error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

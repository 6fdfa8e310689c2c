//! # Hello Vulkan
//!
//! Bootstraps a Vulkan rendering context on top of a GLFW window and drives a
//! continuously repeating draw loop that renders a static, procedural triangle.
//!
//! ## Stages
//!
//! ```text
//! VulkanInstance ─► Surface ─► DeviceSelector ─► LogicalDevice
//!     ─► PresentationChain ─► RenderTarget ─► FrameScheduler (loop)
//! ```
//!
//! [`render::vulkan::VulkanRenderer`] owns every stage and tears them down in
//! exact reverse creation order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hello_vulkan::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     hello_vulkan::foundation::logging::init();
//!
//!     let config = RendererConfig::default();
//!     let window = Window::new(config.window.width, config.window.height)?;
//!     let backend = AshBackend::new()?;
//!
//!     let mut renderer = VulkanRenderer::bootstrap(backend, window, &config, &config.shaders)?;
//!     renderer.run()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, RendererConfig, ShaderConfig, WindowConfig},
        render::vulkan::{
            AshBackend, GraphicsBackend, ShaderSource, VulkanError, VulkanRenderer, VulkanResult,
            Window, WindowError, WindowSystem,
        },
    };
}

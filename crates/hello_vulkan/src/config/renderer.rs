//! # Renderer Configuration
//!
//! Application metadata, window dimensions and shader locations consumed by
//! the bootstrap. Every field has a default, so a partial file is enough.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Config, ConfigError};

/// Fixed window title; not configurable
pub const WINDOW_TITLE: &str = "Hello";

/// # Shader Configuration
///
/// Locations of the pre-compiled SPIR-V blobs for the two pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the usual output directories so the binary can be launched from
    /// the workspace root or from its crate directory.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = [
            "target/shaders/",
            "shaders/",
            "resources/shaders/",
            "../target/shaders/",
            "./",
        ];

        let find = |name: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{dir}{name}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("shaders/{name}"))
        };

        Self {
            vertex_shader_path: find(base_vertex),
            fragment_shader_path: find(base_fragment),
        }
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("vert.spv", "frag.spv")
    }
}

/// Window dimensions in pixels
///
/// Used both to create the window and as the requested swapchain extent
/// whenever the surface leaves the choice to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Client area width
    pub width: u32,
    /// Client area height
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { width: 800, height: 600 }
    }
}

/// # Renderer Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Engine name for Vulkan instance creation
    pub engine_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Window dimensions
    pub window: WindowConfig,
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Enable `VK_LAYER_KHRONOS_validation` (debug builds only)
    pub enable_validation: bool,
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Set window dimensions
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window = WindowConfig { width, height };
        self
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Hello World".to_string(),
            engine_name: "No Engine".to_string(),
            application_version: (1, 0, 0),
            window: WindowConfig::default(),
            shaders: ShaderConfig::default(),
            enable_validation: false,
        }
    }
}

impl Config for RendererConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Window dimensions must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        Ok(())
    }
}

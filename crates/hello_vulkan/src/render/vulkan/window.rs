//! Window management using GLFW
//!
//! Provides the fixed-size, non-resizable window the triangle is presented
//! to, behind the [`WindowSystem`] trait the bootstrap consumes.

use ash::vk;
use thiserror::Error;

use crate::config::WINDOW_TITLE;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Error reported by GLFW after initialization
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Windowing layer as seen by the Vulkan bootstrap
///
/// Destroying the window is tied to dropping the value, which the renderer
/// does after every Vulkan object is gone.
pub trait WindowSystem {
    /// Whether a Vulkan loader and ICD were found
    fn vulkan_supported(&self) -> bool;

    /// Instance extensions needed to present to this window
    ///
    /// `None` when the windowing layer cannot report them.
    fn required_instance_extensions(&self) -> Option<Vec<String>>;

    /// Create a presentation surface on `instance`
    fn create_surface(&self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR>;

    /// Process pending events without blocking
    fn poll_events(&mut self);

    /// Whether the user asked the window to close
    fn should_close(&self) -> bool;
}

/// GLFW window wrapper with proper resource management
///
/// Field order matters: the window is destroyed before the last `Glfw`
/// handle goes away and terminates the library.
pub struct Window {
    window: glfw::PWindow,
    _events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    glfw: glfw::Glfw,
}

impl Window {
    /// Initialise GLFW and open a `width` x `height` window titled "Hello"
    pub fn new(width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::log_errors).map_err(|_| WindowError::InitializationFailed)?;

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(false));

        let (mut window, events) = glfw
            .create_window(width, height, WINDOW_TITLE, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_close_polling(true);

        log::info!("Created {}x{} window", width, height);

        Ok(Self {
            window,
            _events: events,
            glfw,
        })
    }

    /// Framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }
}

impl WindowSystem for Window {
    fn vulkan_supported(&self) -> bool {
        self.glfw.vulkan_supported()
    }

    fn required_instance_extensions(&self) -> Option<Vec<String>> {
        self.glfw.get_required_instance_extensions()
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    fn create_surface(&self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }

    fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }
}

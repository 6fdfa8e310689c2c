//! Vulkan context management
//!
//! Instance creation, the debug report hook installed in debug builds, and
//! the window surface the rest of the bootstrap presents to.

use ash::vk;
use std::ffi::CString;
use std::os::raw::c_char;
use thiserror::Error;

use super::backend::GraphicsBackend;
use super::window::WindowSystem;
use crate::config::RendererConfig;

/// Vulkan-specific error types
///
/// One kind per bootstrap step, so a failure names the step that produced
/// it. Every kind is fatal for the run.
#[derive(Error, Debug)]
pub enum VulkanError {
    /// The windowing layer reports no Vulkan support
    #[error("Vulkan is not supported by the windowing layer")]
    BackendUnsupported,

    /// The windowing layer could not report its instance extensions
    #[error("Failed to query required instance extensions")]
    ExtensionQueryFailed,

    /// Instance creation (or loading the driver) failed
    #[error("Context creation failed: {0}")]
    ContextCreationFailed(String),

    /// Debug report callback installation failed
    #[error("Debug hook creation failed: {0:?}")]
    DebugHookCreationFailed(vk::Result),

    /// Surface creation failed
    #[error("Surface creation failed: {0}")]
    SurfaceCreationFailed(String),

    /// No physical device passed the suitability checks
    #[error("No suitable physical device found")]
    DeviceNotFound,

    /// Logical device creation failed
    #[error("Logical device creation failed: {0:?}")]
    LogicalDeviceCreationFailed(vk::Result),

    /// Swapchain creation or image retrieval failed
    #[error("Swapchain creation failed: {0:?}")]
    SwapchainCreationFailed(vk::Result),

    /// Image view creation failed
    #[error("Image view creation failed: {0:?}")]
    ImageViewCreationFailed(vk::Result),

    /// Render pass creation failed
    #[error("Render pass creation failed: {0:?}")]
    RenderPassCreationFailed(vk::Result),

    /// Pipeline layout, shader module or pipeline creation failed
    #[error("Pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// Framebuffer creation failed
    #[error("Framebuffer creation failed: {0:?}")]
    FramebufferCreationFailed(vk::Result),

    /// Command pool creation, buffer allocation or recording failed
    #[error("Command pool or buffer creation failed: {0:?}")]
    CommandPoolOrBufferCreationFailed(vk::Result),

    /// Semaphore creation failed
    #[error("Sync primitive creation failed: {0:?}")]
    SyncPrimitiveCreationFailed(vk::Result),

    /// Idle wait, acquire or submit failed during a frame
    #[error("Frame submission failed: {0:?}")]
    FrameSubmissionFailed(vk::Result),

    /// Queue present failed
    #[error("Presentation failed: {0:?}")]
    PresentationFailed(vk::Result),

    /// General Vulkan API error from a query outside any creation step
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Khronos validation layer
pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Instance extensions added on top of the windowing set in debug builds
#[cfg(debug_assertions)]
pub const DEBUG_INSTANCE_EXTENSIONS: [&str; 2] = [
    "VK_EXT_debug_report",
    "VK_KHR_get_physical_device_properties2",
];

/// Turn a list of names into owned C strings
///
/// Names containing an interior NUL cannot come from a driver or the
/// windowing layer; they are reported against `on_error`.
pub(crate) fn to_cstrings<I, S>(names: I, on_error: impl Fn(String) -> VulkanError) -> VulkanResult<Vec<CString>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| CString::new(name.as_ref()).map_err(|e| on_error(e.to_string())))
        .collect()
}

/// Vulkan instance plus the debug report hook hanging off it
pub struct VulkanInstance {
    handle: vk::Instance,
    debug_callback: vk::DebugReportCallbackEXT,
}

impl VulkanInstance {
    /// Create the instance for `window`
    ///
    /// The window decides the base extension set. Debug builds add the
    /// debug report extensions and install an ERROR|WARNING callback; the
    /// validation layer is only enabled when the config asks for it.
    pub fn new<B, W>(backend: &mut B, window: &W, config: &RendererConfig) -> VulkanResult<Self>
    where
        B: GraphicsBackend,
        W: WindowSystem,
    {
        if !window.vulkan_supported() {
            return Err(VulkanError::BackendUnsupported);
        }

        let window_extensions = window
            .required_instance_extensions()
            .ok_or(VulkanError::ExtensionQueryFailed)?;

        #[allow(unused_mut)]
        let mut extension_names = window_extensions;
        #[cfg(debug_assertions)]
        extension_names.extend(DEBUG_INSTANCE_EXTENSIONS.iter().map(|name| name.to_string()));

        log::debug!("Instance extensions: {:?}", extension_names);

        let layer_names = Self::requested_layers(backend, config)?;

        let app_name = CString::new(config.application_name.as_str())
            .map_err(|e| VulkanError::ContextCreationFailed(e.to_string()))?;
        let engine_name = CString::new(config.engine_name.as_str())
            .map_err(|e| VulkanError::ContextCreationFailed(e.to_string()))?;
        let (major, minor, patch) = config.application_version;

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extensions = to_cstrings(&extension_names, VulkanError::ContextCreationFailed)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
        let layers = to_cstrings(&layer_names, VulkanError::ContextCreationFailed)?;
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|layer| layer.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let handle = backend
            .create_instance(&create_info)
            .map_err(|e| VulkanError::ContextCreationFailed(format!("{e:?}")))?;

        #[allow(unused_mut)]
        let mut instance = Self {
            handle,
            debug_callback: vk::DebugReportCallbackEXT::null(),
        };

        #[cfg(debug_assertions)]
        if let Err(e) = instance.install_debug_hook(backend) {
            instance.destroy(backend);
            return Err(e);
        }

        log::info!("Vulkan instance created for '{}'", config.application_name);
        Ok(instance)
    }

    /// Layers to enable for this run
    fn requested_layers<B: GraphicsBackend>(backend: &B, config: &RendererConfig) -> VulkanResult<Vec<String>> {
        if !(cfg!(debug_assertions) && config.enable_validation) {
            return Ok(Vec::new());
        }

        let available = backend.instance_layers().map_err(VulkanError::Api)?;
        for layer in &available {
            log::debug!("Instance layer available: {}", layer);
        }

        if available.iter().any(|layer| layer == VALIDATION_LAYER) {
            log::info!("Enabling {}", VALIDATION_LAYER);
            Ok(vec![VALIDATION_LAYER.to_string()])
        } else {
            Err(VulkanError::ContextCreationFailed(format!(
                "{VALIDATION_LAYER} requested but not available"
            )))
        }
    }

    #[cfg(debug_assertions)]
    fn install_debug_hook<B: GraphicsBackend>(&mut self, backend: &mut B) -> VulkanResult<()> {
        let create_info = vk::DebugReportCallbackCreateInfoEXT::builder()
            .flags(vk::DebugReportFlagsEXT::ERROR | vk::DebugReportFlagsEXT::WARNING)
            .pfn_callback(Some(debug_report_callback));

        self.debug_callback = backend
            .create_debug_report_callback(&create_info)
            .map_err(VulkanError::DebugHookCreationFailed)?;

        log::debug!("Debug report callback installed");
        Ok(())
    }

    /// Raw instance handle
    pub fn handle(&self) -> vk::Instance {
        self.handle
    }

    /// Whether a debug report callback is installed
    pub fn has_debug_hook(&self) -> bool {
        self.debug_callback != vk::DebugReportCallbackEXT::null()
    }

    /// Remove the debug hook, then destroy the instance
    ///
    /// Safe to call more than once.
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &mut B) {
        if self.debug_callback != vk::DebugReportCallbackEXT::null() {
            log::debug!("Destroying debug report callback");
            backend.destroy_debug_report_callback(self.debug_callback);
            self.debug_callback = vk::DebugReportCallbackEXT::null();
        }

        if self.handle != vk::Instance::null() {
            log::debug!("Destroying Vulkan instance");
            backend.destroy_instance();
            self.handle = vk::Instance::null();
        }
    }
}

/// Debug report callback forwarding driver messages to `log`
#[cfg(debug_assertions)]
unsafe extern "system" fn debug_report_callback(
    flags: vk::DebugReportFlagsEXT,
    object_type: vk::DebugReportObjectTypeEXT,
    _object: u64,
    _location: usize,
    _message_code: i32,
    p_layer_prefix: *const c_char,
    p_message: *const c_char,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let read = |ptr: *const c_char| {
        if ptr.is_null() {
            String::new()
        } else {
            std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    };
    let prefix = read(p_layer_prefix);
    let message = read(p_message);

    if flags.contains(vk::DebugReportFlagsEXT::ERROR) {
        log::error!("[Vulkan] {} {:?} - {}", prefix, object_type, message);
    } else {
        log::warn!("[Vulkan] {} {:?} - {}", prefix, object_type, message);
    }

    vk::FALSE
}

/// Window surface
pub struct Surface {
    handle: vk::SurfaceKHR,
}

impl Surface {
    /// Create a surface for `window` on `instance`
    pub fn new<W: WindowSystem>(window: &W, instance: &VulkanInstance) -> VulkanResult<Self> {
        let handle = window
            .create_surface(instance.handle())
            .map_err(|e| VulkanError::SurfaceCreationFailed(e.to_string()))?;

        log::debug!("Window surface created");
        Ok(Self { handle })
    }

    /// Get the underlying surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Destroy the surface; safe to call more than once
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        if self.handle != vk::SurfaceKHR::null() {
            log::debug!("Destroying surface");
            backend.destroy_surface(self.handle);
            self.handle = vk::SurfaceKHR::null();
        }
    }
}

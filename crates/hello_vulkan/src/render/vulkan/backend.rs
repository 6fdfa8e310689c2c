//! Backend abstraction trait for the Vulkan API surface
//!
//! Every stage of the bootstrap talks to the driver through
//! [`GraphicsBackend`]. The stages build the `vk::*CreateInfo` structures
//! themselves and hand them over; an implementation only forwards them to a
//! driver (see [`AshBackend`](super::AshBackend)) or simulates one in tests.
//!
//! Calls report the raw `vk::Result` on failure. Mapping that onto a
//! [`VulkanError`](super::VulkanError) kind is the caller's job, since only
//! the caller knows which bootstrap step failed.

use ash::vk;
use std::ffi::CStr;
use std::os::raw::c_char;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, vk::Result>;

/// Read a fixed-size, NUL-terminated name field from a driver struct
pub(crate) fn name_to_string(raw: &[c_char]) -> String {
    if !raw.contains(&0) {
        return String::new();
    }
    // SAFETY: the slice holds a NUL terminator within bounds.
    unsafe { CStr::from_ptr(raw.as_ptr()) }.to_string_lossy().into_owned()
}

/// Main graphics backend trait
///
/// Methods taking `&mut self` install or remove the instance/device level
/// dispatch tables; everything else is a plain call through them.
/// Destroying a null handle must be a no-op.
pub trait GraphicsBackend {
    // --- instance ---------------------------------------------------------

    /// Names of the instance layers the loader knows about
    fn instance_layers(&self) -> BackendResult<Vec<String>>;

    /// Create the instance and load instance-level entry points
    fn create_instance(&mut self, create_info: &vk::InstanceCreateInfo) -> BackendResult<vk::Instance>;

    /// Destroy the instance created by [`create_instance`](Self::create_instance)
    fn destroy_instance(&mut self);

    /// Install an error/warning report callback
    fn create_debug_report_callback(
        &mut self,
        create_info: &vk::DebugReportCallbackCreateInfoEXT,
    ) -> BackendResult<vk::DebugReportCallbackEXT>;

    /// Remove a report callback
    fn destroy_debug_report_callback(&mut self, callback: vk::DebugReportCallbackEXT);

    /// Destroy a surface produced by the windowing layer
    fn destroy_surface(&self, surface: vk::SurfaceKHR);

    // --- physical devices -------------------------------------------------

    /// Enumerate all physical devices
    fn enumerate_physical_devices(&self) -> BackendResult<Vec<vk::PhysicalDevice>>;

    /// Device properties (diagnostics)
    fn physical_device_properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties;

    /// Device features (diagnostics)
    fn physical_device_features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;

    /// Names of the device-level extensions the device advertises
    fn device_extensions(&self, device: vk::PhysicalDevice) -> BackendResult<Vec<String>>;

    /// Queue family list, in family-index order
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;

    /// Whether `family` can present to `surface`
    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<bool>;

    /// Surface capability record
    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<vk::SurfaceCapabilitiesKHR>;

    /// Supported surface formats, in driver order
    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<Vec<vk::SurfaceFormatKHR>>;

    /// Supported present modes, in driver order
    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<Vec<vk::PresentModeKHR>>;

    // --- logical device ---------------------------------------------------

    /// Create the logical device and load device-level entry points
    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo,
    ) -> BackendResult<vk::Device>;

    /// Destroy the logical device
    fn destroy_device(&mut self);

    /// Fetch a queue created along with the device
    fn device_queue(&self, family: u32, index: u32) -> vk::Queue;

    /// Block until the whole device is idle
    fn device_wait_idle(&self) -> BackendResult<()>;

    /// Block until `queue` is idle
    fn queue_wait_idle(&self, queue: vk::Queue) -> BackendResult<()>;

    // --- presentation -----------------------------------------------------

    /// Create a swapchain
    fn create_swapchain(&self, create_info: &vk::SwapchainCreateInfoKHR) -> BackendResult<vk::SwapchainKHR>;

    /// Images actually owned by the swapchain
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> BackendResult<Vec<vk::Image>>;

    /// Destroy a swapchain (its images go with it)
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// Create an image view
    fn create_image_view(&self, create_info: &vk::ImageViewCreateInfo) -> BackendResult<vk::ImageView>;

    /// Destroy an image view
    fn destroy_image_view(&self, view: vk::ImageView);

    // --- render target ----------------------------------------------------

    /// Create a render pass
    fn create_render_pass(&self, create_info: &vk::RenderPassCreateInfo) -> BackendResult<vk::RenderPass>;

    /// Destroy a render pass
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    /// Create a pipeline layout
    fn create_pipeline_layout(
        &self,
        create_info: &vk::PipelineLayoutCreateInfo,
    ) -> BackendResult<vk::PipelineLayout>;

    /// Destroy a pipeline layout
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    /// Create a shader module from SPIR-V words
    fn create_shader_module(&self, create_info: &vk::ShaderModuleCreateInfo) -> BackendResult<vk::ShaderModule>;

    /// Destroy a shader module
    fn destroy_shader_module(&self, module: vk::ShaderModule);

    /// Create a single graphics pipeline
    fn create_graphics_pipeline(
        &self,
        create_info: &vk::GraphicsPipelineCreateInfo,
    ) -> BackendResult<vk::Pipeline>;

    /// Destroy a pipeline
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    /// Create a framebuffer
    fn create_framebuffer(&self, create_info: &vk::FramebufferCreateInfo) -> BackendResult<vk::Framebuffer>;

    /// Destroy a framebuffer
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    // --- commands ---------------------------------------------------------

    /// Create a command pool
    fn create_command_pool(&self, create_info: &vk::CommandPoolCreateInfo) -> BackendResult<vk::CommandPool>;

    /// Destroy a command pool, freeing every buffer allocated from it
    fn destroy_command_pool(&self, pool: vk::CommandPool);

    /// Allocate command buffers from a pool
    fn allocate_command_buffers(
        &self,
        allocate_info: &vk::CommandBufferAllocateInfo,
    ) -> BackendResult<Vec<vk::CommandBuffer>>;

    /// Begin recording
    fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        begin_info: &vk::CommandBufferBeginInfo,
    ) -> BackendResult<()>;

    /// Finish recording
    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> BackendResult<()>;

    /// Record a render pass begin
    fn cmd_begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        begin_info: &vk::RenderPassBeginInfo,
        contents: vk::SubpassContents,
    );

    /// Record a render pass end
    fn cmd_end_render_pass(&self, command_buffer: vk::CommandBuffer);

    /// Record a pipeline bind
    fn cmd_bind_pipeline(
        &self,
        command_buffer: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    );

    /// Record a non-indexed draw
    fn cmd_draw(
        &self,
        command_buffer: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    // --- synchronization and submission -----------------------------------

    /// Create a binary semaphore
    fn create_semaphore(&self, create_info: &vk::SemaphoreCreateInfo) -> BackendResult<vk::Semaphore>;

    /// Destroy a semaphore
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// Acquire the next presentable image; returns `(index, suboptimal)`
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> BackendResult<(u32, bool)>;

    /// Submit work to a queue
    fn queue_submit(&self, queue: vk::Queue, submits: &[vk::SubmitInfo], fence: vk::Fence) -> BackendResult<()>;

    /// Queue a present; returns `true` when the swapchain is suboptimal
    fn queue_present(&self, queue: vk::Queue, present_info: &vk::PresentInfoKHR) -> BackendResult<bool>;
}

//! Vulkan driver backend built on [`ash`]
//!
//! Loads the Vulkan loader at construction, then installs the instance and
//! device dispatch tables as the bootstrap creates those objects. Calls made
//! before the matching table exists fail with
//! `ERROR_INITIALIZATION_FAILED` rather than panicking.

#[allow(deprecated)]
use ash::extensions::ext::DebugReport;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};

use super::backend::{name_to_string, BackendResult, GraphicsBackend};
use super::context::{VulkanError, VulkanResult};

/// Graphics backend forwarding to the system Vulkan driver
#[allow(deprecated)]
pub struct AshBackend {
    entry: Entry,
    instance: Option<Instance>,
    surface_loader: Option<Surface>,
    debug_report: Option<DebugReport>,
    device: Option<Device>,
    swapchain_loader: Option<SwapchainLoader>,
}

impl AshBackend {
    /// Load the Vulkan loader library
    pub fn new() -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::ContextCreationFailed(format!("Failed to load Vulkan: {e:?}")))?;

        Ok(Self {
            entry,
            instance: None,
            surface_loader: None,
            debug_report: None,
            device: None,
            swapchain_loader: None,
        })
    }

    fn instance(&self) -> BackendResult<&Instance> {
        self.instance.as_ref().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn surface_loader(&self) -> BackendResult<&Surface> {
        self.surface_loader.as_ref().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn device(&self) -> BackendResult<&Device> {
        self.device.as_ref().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn swapchain_loader(&self) -> BackendResult<&SwapchainLoader> {
        self.swapchain_loader.as_ref().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

impl GraphicsBackend for AshBackend {
    fn instance_layers(&self) -> BackendResult<Vec<String>> {
        #[allow(unused_unsafe)]
        let layers = unsafe { self.entry.enumerate_instance_layer_properties()? };
        Ok(layers.iter().map(|layer| name_to_string(&layer.layer_name)).collect())
    }

    #[allow(deprecated)]
    fn create_instance(&mut self, create_info: &vk::InstanceCreateInfo) -> BackendResult<vk::Instance> {
        let instance = unsafe { self.entry.create_instance(create_info, None)? };
        let handle = instance.handle();

        self.surface_loader = Some(Surface::new(&self.entry, &instance));
        self.debug_report = Some(DebugReport::new(&self.entry, &instance));
        self.instance = Some(instance);

        Ok(handle)
    }

    fn destroy_instance(&mut self) {
        self.surface_loader = None;
        self.debug_report = None;
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }

    #[allow(deprecated)]
    fn create_debug_report_callback(
        &mut self,
        create_info: &vk::DebugReportCallbackCreateInfoEXT,
    ) -> BackendResult<vk::DebugReportCallbackEXT> {
        let loader = self.debug_report.as_ref().ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        unsafe { loader.create_debug_report_callback(create_info, None) }
    }

    #[allow(deprecated)]
    fn destroy_debug_report_callback(&mut self, callback: vk::DebugReportCallbackEXT) {
        if let Some(loader) = &self.debug_report {
            unsafe { loader.destroy_debug_report_callback(callback, None) };
        }
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        if let Ok(loader) = self.surface_loader() {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn enumerate_physical_devices(&self) -> BackendResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance()?.enumerate_physical_devices() }
    }

    fn physical_device_properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        self.instance()
            .map(|instance| unsafe { instance.get_physical_device_properties(device) })
            .unwrap_or_default()
    }

    fn physical_device_features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        self.instance()
            .map(|instance| unsafe { instance.get_physical_device_features(device) })
            .unwrap_or_default()
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> BackendResult<Vec<String>> {
        let extensions = unsafe { self.instance()?.enumerate_device_extension_properties(device)? };
        Ok(extensions.iter().map(|ext| name_to_string(&ext.extension_name)).collect())
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.instance()
            .map(|instance| unsafe { instance.get_physical_device_queue_family_properties(device) })
            .unwrap_or_default()
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<bool> {
        unsafe { self.surface_loader()?.get_physical_device_surface_support(device, family, surface) }
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<vk::SurfaceCapabilitiesKHR> {
        unsafe { self.surface_loader()?.get_physical_device_surface_capabilities(device, surface) }
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe { self.surface_loader()?.get_physical_device_surface_formats(device, surface) }
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> BackendResult<Vec<vk::PresentModeKHR>> {
        unsafe { self.surface_loader()?.get_physical_device_surface_present_modes(device, surface) }
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo,
    ) -> BackendResult<vk::Device> {
        let instance = self.instance()?;
        let device = unsafe { instance.create_device(physical_device, create_info, None)? };
        let handle = device.handle();

        self.swapchain_loader = Some(SwapchainLoader::new(instance, &device));
        self.device = Some(device);

        Ok(handle)
    }

    fn destroy_device(&mut self) {
        self.swapchain_loader = None;
        if let Some(device) = self.device.take() {
            unsafe { device.destroy_device(None) };
        }
    }

    fn device_queue(&self, family: u32, index: u32) -> vk::Queue {
        self.device()
            .map(|device| unsafe { device.get_device_queue(family, index) })
            .unwrap_or_default()
    }

    fn device_wait_idle(&self) -> BackendResult<()> {
        unsafe { self.device()?.device_wait_idle() }
    }

    fn queue_wait_idle(&self, queue: vk::Queue) -> BackendResult<()> {
        unsafe { self.device()?.queue_wait_idle(queue) }
    }

    fn create_swapchain(&self, create_info: &vk::SwapchainCreateInfoKHR) -> BackendResult<vk::SwapchainKHR> {
        unsafe { self.swapchain_loader()?.create_swapchain(create_info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> BackendResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader()?.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        if let Ok(loader) = self.swapchain_loader() {
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(&self, create_info: &vk::ImageViewCreateInfo) -> BackendResult<vk::ImageView> {
        unsafe { self.device()?.create_image_view(create_info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_image_view(view, None) };
        }
    }

    fn create_render_pass(&self, create_info: &vk::RenderPassCreateInfo) -> BackendResult<vk::RenderPass> {
        unsafe { self.device()?.create_render_pass(create_info, None) }
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_render_pass(render_pass, None) };
        }
    }

    fn create_pipeline_layout(
        &self,
        create_info: &vk::PipelineLayoutCreateInfo,
    ) -> BackendResult<vk::PipelineLayout> {
        unsafe { self.device()?.create_pipeline_layout(create_info, None) }
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_pipeline_layout(layout, None) };
        }
    }

    fn create_shader_module(&self, create_info: &vk::ShaderModuleCreateInfo) -> BackendResult<vk::ShaderModule> {
        unsafe { self.device()?.create_shader_module(create_info, None) }
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_shader_module(module, None) };
        }
    }

    fn create_graphics_pipeline(
        &self,
        create_info: &vk::GraphicsPipelineCreateInfo,
    ) -> BackendResult<vk::Pipeline> {
        let pipelines = unsafe {
            self.device()?
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(create_info), None)
                .map_err(|(_, err)| err)?
        };

        pipelines.first().copied().ok_or(vk::Result::ERROR_UNKNOWN)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_pipeline(pipeline, None) };
        }
    }

    fn create_framebuffer(&self, create_info: &vk::FramebufferCreateInfo) -> BackendResult<vk::Framebuffer> {
        unsafe { self.device()?.create_framebuffer(create_info, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }
    }

    fn create_command_pool(&self, create_info: &vk::CommandPoolCreateInfo) -> BackendResult<vk::CommandPool> {
        unsafe { self.device()?.create_command_pool(create_info, None) }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_command_pool(pool, None) };
        }
    }

    fn allocate_command_buffers(
        &self,
        allocate_info: &vk::CommandBufferAllocateInfo,
    ) -> BackendResult<Vec<vk::CommandBuffer>> {
        unsafe { self.device()?.allocate_command_buffers(allocate_info) }
    }

    fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        begin_info: &vk::CommandBufferBeginInfo,
    ) -> BackendResult<()> {
        unsafe { self.device()?.begin_command_buffer(command_buffer, begin_info) }
    }

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> BackendResult<()> {
        unsafe { self.device()?.end_command_buffer(command_buffer) }
    }

    fn cmd_begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        begin_info: &vk::RenderPassBeginInfo,
        contents: vk::SubpassContents,
    ) {
        if let Ok(device) = self.device() {
            unsafe { device.cmd_begin_render_pass(command_buffer, begin_info, contents) };
        }
    }

    fn cmd_end_render_pass(&self, command_buffer: vk::CommandBuffer) {
        if let Ok(device) = self.device() {
            unsafe { device.cmd_end_render_pass(command_buffer) };
        }
    }

    fn cmd_bind_pipeline(
        &self,
        command_buffer: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    ) {
        if let Ok(device) = self.device() {
            unsafe { device.cmd_bind_pipeline(command_buffer, bind_point, pipeline) };
        }
    }

    fn cmd_draw(
        &self,
        command_buffer: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        if let Ok(device) = self.device() {
            unsafe { device.cmd_draw(command_buffer, vertex_count, instance_count, first_vertex, first_instance) };
        }
    }

    fn create_semaphore(&self, create_info: &vk::SemaphoreCreateInfo) -> BackendResult<vk::Semaphore> {
        unsafe { self.device()?.create_semaphore(create_info, None) }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        if let Ok(device) = self.device() {
            unsafe { device.destroy_semaphore(semaphore, None) };
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> BackendResult<(u32, bool)> {
        unsafe { self.swapchain_loader()?.acquire_next_image(swapchain, timeout, semaphore, fence) }
    }

    fn queue_submit(&self, queue: vk::Queue, submits: &[vk::SubmitInfo], fence: vk::Fence) -> BackendResult<()> {
        unsafe { self.device()?.queue_submit(queue, submits, fence) }
    }

    fn queue_present(&self, queue: vk::Queue, present_info: &vk::PresentInfoKHR) -> BackendResult<bool> {
        unsafe { self.swapchain_loader()?.queue_present(queue, present_info) }
    }
}

impl Drop for AshBackend {
    fn drop(&mut self) {
        // The renderer tears everything down first; this only catches a
        // backend dropped mid-bootstrap.
        self.destroy_device();
        self.destroy_instance();
    }
}

//! In-memory Vulkan driver and window for tests
//!
//! Hands out unique raw handles, records every call by name in a journal,
//! tracks which handles are alive and checks the ordering rules a real
//! validation layer would: binary semaphores signalled before they are
//! waited on, children destroyed before their parents, no double destroys.
//! Any call can be made to fail by name.

use ash::vk::{self, Handle};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::rc::Rc;

use super::backend::{BackendResult, GraphicsBackend};
use super::shader::{ShaderSource, ShaderStage};
use super::window::{WindowError, WindowResult, WindowSystem};

const PHYSICAL_DEVICE_BASE: u64 = 0x1_0000;
const QUEUE_BASE: u64 = 0x2_0000;
const HANDLE_BASE: u64 = 0x10_0000;

/// Failure returned by injected faults
pub const INJECTED_FAILURE: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

/// Shared state between the backend, the window and the test
pub type SharedState = Rc<RefCell<SimState>>;

/// Read `count` elements behind a create-info pointer
///
/// # Safety
/// `ptr` must be null or valid for `count` reads, as the Vulkan valid usage
/// rules already require of every create info the bootstrap builds.
unsafe fn slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, count as usize)
    }
}

/// # Safety
/// Same contract as [`slice`], for an array of C strings.
unsafe fn names(ptr: *const *const c_char, count: u32) -> Vec<String> {
    slice(ptr, count)
        .iter()
        .map(|name| CStr::from_ptr(*name).to_string_lossy().into_owned())
        .collect()
}

fn raw_name(name: &str) -> [c_char; vk::MAX_PHYSICAL_DEVICE_NAME_SIZE] {
    let mut raw = [0 as c_char; vk::MAX_PHYSICAL_DEVICE_NAME_SIZE];
    for (dst, src) in raw.iter_mut().zip(name.bytes().take(vk::MAX_PHYSICAL_DEVICE_NAME_SIZE - 1)) {
        *dst = src as c_char;
    }
    raw
}

/// A physical device the simulated driver reports
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub name: String,
    pub extensions: Vec<String>,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub present_families: Vec<u32>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SimDevice {
    /// A fully capable device with one graphics+present family
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extensions: vec![
                "VK_KHR_swapchain".to_string(),
                "VK_KHR_portability_subset".to_string(),
                "VK_KHR_maintenance1".to_string(),
            ],
            queue_families: vec![vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            }],
            present_families: vec![0],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|ext| ext.to_string()).collect();
        self
    }

    pub fn with_queue_families(mut self, families: Vec<vk::QueueFamilyProperties>, present: &[u32]) -> Self {
        self.queue_families = families;
        self.present_families = present.to_vec();
        self
    }

    pub fn with_formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_present_modes(mut self, modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = modes;
        self
    }

    pub fn with_capabilities(mut self, capabilities: vk::SurfaceCapabilitiesKHR) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// What the last swapchain create info asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainRequest {
    pub min_image_count: u32,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
}

/// Driver state
pub struct SimState {
    /// Every call, by method name, in order
    pub journal: Vec<String>,
    /// Ordering rules broken by the caller
    pub violations: Vec<String>,
    pub devices: Vec<SimDevice>,
    pub available_layers: Vec<String>,
    /// When set, the swapchain returns this many images regardless of the request
    pub swapchain_image_override: Option<u32>,

    pub instance_extensions: Vec<String>,
    pub instance_layers: Vec<String>,
    pub device_extensions_enabled: Vec<String>,
    pub queue_create_families: Vec<u32>,
    pub swapchain_request: Option<SwapchainRequest>,
    pub pipeline_state: Option<(u32, vk::CullModeFlags, vk::FrontFace)>,
    pub framebuffer_attachments: Vec<Vec<vk::ImageView>>,
    pub clear_colors: Vec<[f32; 4]>,
    pub draws: Vec<(vk::CommandBuffer, [u32; 4])>,
    pub submitted_buffers: Vec<vk::CommandBuffer>,
    pub presented_images: Vec<u32>,

    live: BTreeMap<u64, &'static str>,
    next_handle: u64,
    fail_on: Option<(&'static str, Option<usize>)>,
    signalled: HashSet<u64>,
    instance: Option<u64>,
    device: Option<u64>,
    swapchain_images: Vec<vk::Image>,
    next_image: usize,
}

impl SimState {
    fn new() -> Self {
        Self {
            journal: Vec::new(),
            violations: Vec::new(),
            devices: vec![SimDevice::new("Simulated GPU")],
            available_layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            swapchain_image_override: None,
            instance_extensions: Vec::new(),
            instance_layers: Vec::new(),
            device_extensions_enabled: Vec::new(),
            queue_create_families: Vec::new(),
            swapchain_request: None,
            pipeline_state: None,
            framebuffer_attachments: Vec::new(),
            clear_colors: Vec::new(),
            draws: Vec::new(),
            submitted_buffers: Vec::new(),
            presented_images: Vec::new(),
            live: BTreeMap::new(),
            next_handle: HANDLE_BASE,
            fail_on: None,
            signalled: HashSet::new(),
            instance: None,
            device: None,
            swapchain_images: Vec::new(),
            next_image: 0,
        }
    }

    /// Make every call named `call` fail
    pub fn fail_on(&mut self, call: &'static str) {
        self.fail_on = Some((call, None));
    }

    /// Make only the `n`th call (1-based) named `call` fail
    pub fn fail_on_nth(&mut self, call: &'static str, n: usize) {
        self.fail_on = Some((call, Some(n)));
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.journal.iter().filter(|entry| *entry == call).count()
    }

    /// Handles created and not yet destroyed
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_of_kind(&self, kind: &str) -> usize {
        self.live.values().filter(|live| **live == kind).count()
    }

    pub fn live_kinds(&self) -> Vec<&'static str> {
        self.live.values().copied().collect()
    }

    /// Journal entries that destroy something, in order
    pub fn destroy_calls(&self) -> Vec<String> {
        self.journal
            .iter()
            .filter(|call| call.starts_with("destroy_") || call.as_str() == "window_dropped")
            .cloned()
            .collect()
    }

    /// Journal a call and apply any injected fault
    fn call(&mut self, name: &'static str) -> BackendResult<()> {
        self.journal.push(name.to_string());
        match self.fail_on {
            Some((call, None)) if call == name => Err(INJECTED_FAILURE),
            Some((call, Some(n))) if call == name && self.count_calls(name) == n => Err(INJECTED_FAILURE),
            _ => Ok(()),
        }
    }

    fn create(&mut self, kind: &'static str) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        self.live.insert(raw, kind);
        raw
    }

    fn release(&mut self, raw: u64, kind: &'static str) {
        if raw == 0 {
            return;
        }
        match self.live.remove(&raw) {
            Some(live) if live == kind => {}
            Some(live) => self.violations.push(format!("destroyed {live} 0x{raw:x} as {kind}")),
            None => self.violations.push(format!("destroyed unknown or dead {kind} 0x{raw:x}")),
        }
    }

    /// Record a violation if anything other than `allowed` is still alive
    fn require_only(&mut self, destroying: &str, allowed: &[&str]) {
        let blocking: Vec<&str> = self
            .live
            .values()
            .copied()
            .filter(|kind| !allowed.contains(kind))
            .collect();
        if !blocking.is_empty() {
            self.violations.push(format!("{destroying} destroyed while {blocking:?} alive"));
        }
    }

    fn require_live(&mut self, raw: u64, kind: &str, context: &str) {
        if self.live.get(&raw).copied() != Some(kind) {
            self.violations.push(format!("{context}: {kind} 0x{raw:x} is not alive"));
        }
    }

    fn signal(&mut self, semaphore: vk::Semaphore, context: &str) {
        if !self.signalled.insert(semaphore.as_raw()) {
            self.violations.push(format!("{context}: semaphore 0x{:x} already signalled", semaphore.as_raw()));
        }
    }

    fn wait(&mut self, semaphore: vk::Semaphore, context: &str) {
        if !self.signalled.remove(&semaphore.as_raw()) {
            self.violations.push(format!("{context}: waited on unsignalled semaphore 0x{:x}", semaphore.as_raw()));
        }
    }

    fn sim_device(&self, device: vk::PhysicalDevice) -> Option<&SimDevice> {
        let index = device.as_raw().checked_sub(PHYSICAL_DEVICE_BASE)?;
        self.devices.get(index as usize)
    }
}

/// Simulated graphics backend
pub struct SimulatedBackend {
    state: SharedState,
}

impl SimulatedBackend {
    /// Backend with the default single capable device
    pub fn new() -> (Self, SharedState) {
        let state = Rc::new(RefCell::new(SimState::new()));
        (Self { state: Rc::clone(&state) }, state)
    }

    fn state(&self) -> std::cell::RefMut<'_, SimState> {
        self.state.borrow_mut()
    }
}

impl GraphicsBackend for SimulatedBackend {
    fn instance_layers(&self) -> BackendResult<Vec<String>> {
        let mut state = self.state();
        state.call("instance_layers")?;
        Ok(state.available_layers.clone())
    }

    fn create_instance(&mut self, create_info: &vk::InstanceCreateInfo) -> BackendResult<vk::Instance> {
        let mut state = self.state();
        state.call("create_instance")?;
        // SAFETY: pointers come from a builder whose backing arrays outlive this call.
        unsafe {
            state.instance_extensions =
                names(create_info.pp_enabled_extension_names, create_info.enabled_extension_count);
            state.instance_layers = names(create_info.pp_enabled_layer_names, create_info.enabled_layer_count);
        }
        let raw = state.create("instance");
        state.instance = Some(raw);
        Ok(vk::Instance::from_raw(raw))
    }

    fn destroy_instance(&mut self) {
        let mut state = self.state();
        state.journal.push("destroy_instance".to_string());
        state.require_only("instance", &["instance"]);
        if let Some(raw) = state.instance.take() {
            state.release(raw, "instance");
        }
    }

    fn create_debug_report_callback(
        &mut self,
        _create_info: &vk::DebugReportCallbackCreateInfoEXT,
    ) -> BackendResult<vk::DebugReportCallbackEXT> {
        let mut state = self.state();
        state.call("create_debug_report_callback")?;
        Ok(vk::DebugReportCallbackEXT::from_raw(state.create("debug_report_callback")))
    }

    fn destroy_debug_report_callback(&mut self, callback: vk::DebugReportCallbackEXT) {
        let mut state = self.state();
        state.journal.push("destroy_debug_report_callback".to_string());
        state.release(callback.as_raw(), "debug_report_callback");
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        let mut state = self.state();
        state.journal.push("destroy_surface".to_string());
        state.require_only("surface", &["instance", "debug_report_callback", "surface"]);
        state.release(surface.as_raw(), "surface");
    }

    fn enumerate_physical_devices(&self) -> BackendResult<Vec<vk::PhysicalDevice>> {
        let mut state = self.state();
        state.call("enumerate_physical_devices")?;
        Ok((0..state.devices.len() as u64)
            .map(|index| vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index))
            .collect())
    }

    fn physical_device_properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        let state = self.state.borrow();
        let mut properties = vk::PhysicalDeviceProperties::default();
        if let Some(sim) = state.sim_device(device) {
            properties.device_name = raw_name(&sim.name);
            properties.vendor_id = 0x10de;
            properties.device_id = device.as_raw() as u32;
            properties.device_type = vk::PhysicalDeviceType::DISCRETE_GPU;
        }
        properties
    }

    fn physical_device_features(&self, _device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::default()
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> BackendResult<Vec<String>> {
        let mut state = self.state();
        state.call("device_extensions")?;
        Ok(state.sim_device(device).map(|sim| sim.extensions.clone()).unwrap_or_default())
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        let state = self.state.borrow();
        state.sim_device(device).map(|sim| sim.queue_families.clone()).unwrap_or_default()
    }

    fn surface_support(&self, device: vk::PhysicalDevice, family: u32, _surface: vk::SurfaceKHR) -> BackendResult<bool> {
        let mut state = self.state();
        state.call("surface_support")?;
        Ok(state
            .sim_device(device)
            .map_or(false, |sim| sim.present_families.contains(&family)))
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> BackendResult<vk::SurfaceCapabilitiesKHR> {
        let mut state = self.state();
        state.call("surface_capabilities")?;
        state
            .sim_device(device)
            .map(|sim| sim.capabilities)
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> BackendResult<Vec<vk::SurfaceFormatKHR>> {
        let mut state = self.state();
        state.call("surface_formats")?;
        Ok(state.sim_device(device).map(|sim| sim.formats.clone()).unwrap_or_default())
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> BackendResult<Vec<vk::PresentModeKHR>> {
        let mut state = self.state();
        state.call("surface_present_modes")?;
        Ok(state.sim_device(device).map(|sim| sim.present_modes.clone()).unwrap_or_default())
    }

    fn create_device(
        &mut self,
        _physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo,
    ) -> BackendResult<vk::Device> {
        let mut state = self.state();
        state.call("create_device")?;
        // SAFETY: pointers come from a builder whose backing arrays outlive this call.
        unsafe {
            state.queue_create_families = slice(create_info.p_queue_create_infos, create_info.queue_create_info_count)
                .iter()
                .map(|info| info.queue_family_index)
                .collect();
            state.device_extensions_enabled =
                names(create_info.pp_enabled_extension_names, create_info.enabled_extension_count);
        }
        let raw = state.create("device");
        state.device = Some(raw);
        Ok(vk::Device::from_raw(raw))
    }

    fn destroy_device(&mut self) {
        let mut state = self.state();
        state.journal.push("destroy_device".to_string());
        state.require_only("device", &["instance", "debug_report_callback", "surface", "device"]);
        if let Some(raw) = state.device.take() {
            state.release(raw, "device");
        }
    }

    fn device_queue(&self, family: u32, _index: u32) -> vk::Queue {
        self.state().journal.push("device_queue".to_string());
        vk::Queue::from_raw(QUEUE_BASE + u64::from(family))
    }

    fn device_wait_idle(&self) -> BackendResult<()> {
        self.state().call("device_wait_idle")
    }

    fn queue_wait_idle(&self, _queue: vk::Queue) -> BackendResult<()> {
        self.state().call("queue_wait_idle")
    }

    fn create_swapchain(&self, create_info: &vk::SwapchainCreateInfoKHR) -> BackendResult<vk::SwapchainKHR> {
        let mut state = self.state();
        state.call("create_swapchain")?;
        // SAFETY: the family list comes from a builder whose backing array outlives this call.
        let queue_family_indices =
            unsafe { slice(create_info.p_queue_family_indices, create_info.queue_family_index_count) }.to_vec();
        state.swapchain_request = Some(SwapchainRequest {
            min_image_count: create_info.min_image_count,
            format: create_info.image_format,
            extent: create_info.image_extent,
            present_mode: create_info.present_mode,
            sharing_mode: create_info.image_sharing_mode,
            queue_family_indices,
        });

        let count = state.swapchain_image_override.unwrap_or(create_info.min_image_count);
        let first = state.next_handle;
        state.next_handle += u64::from(count);
        state.swapchain_images = (first..first + u64::from(count)).map(vk::Image::from_raw).collect();
        state.next_image = 0;

        Ok(vk::SwapchainKHR::from_raw(state.create("swapchain")))
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> BackendResult<Vec<vk::Image>> {
        let mut state = self.state();
        state.call("swapchain_images")?;
        Ok(state.swapchain_images.clone())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut state = self.state();
        state.journal.push("destroy_swapchain".to_string());
        if state.live_of_kind("image_view") > 0 {
            state.violations.push("swapchain destroyed while image views alive".to_string());
        }
        state.release(swapchain.as_raw(), "swapchain");
    }

    fn create_image_view(&self, _create_info: &vk::ImageViewCreateInfo) -> BackendResult<vk::ImageView> {
        let mut state = self.state();
        state.call("create_image_view")?;
        Ok(vk::ImageView::from_raw(state.create("image_view")))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        let mut state = self.state();
        state.journal.push("destroy_image_view".to_string());
        if state.live_of_kind("framebuffer") > 0 {
            state.violations.push("image view destroyed while framebuffers alive".to_string());
        }
        state.release(view.as_raw(), "image_view");
    }

    fn create_render_pass(&self, _create_info: &vk::RenderPassCreateInfo) -> BackendResult<vk::RenderPass> {
        let mut state = self.state();
        state.call("create_render_pass")?;
        Ok(vk::RenderPass::from_raw(state.create("render_pass")))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        let mut state = self.state();
        state.journal.push("destroy_render_pass".to_string());
        if state.live_of_kind("pipeline") > 0 || state.live_of_kind("framebuffer") > 0 {
            state.violations.push("render pass destroyed while users alive".to_string());
        }
        state.release(render_pass.as_raw(), "render_pass");
    }

    fn create_pipeline_layout(&self, _create_info: &vk::PipelineLayoutCreateInfo) -> BackendResult<vk::PipelineLayout> {
        let mut state = self.state();
        state.call("create_pipeline_layout")?;
        Ok(vk::PipelineLayout::from_raw(state.create("pipeline_layout")))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        let mut state = self.state();
        state.journal.push("destroy_pipeline_layout".to_string());
        if state.live_of_kind("pipeline") > 0 {
            state.violations.push("pipeline layout destroyed while pipeline alive".to_string());
        }
        state.release(layout.as_raw(), "pipeline_layout");
    }

    fn create_shader_module(&self, _create_info: &vk::ShaderModuleCreateInfo) -> BackendResult<vk::ShaderModule> {
        let mut state = self.state();
        state.call("create_shader_module")?;
        Ok(vk::ShaderModule::from_raw(state.create("shader_module")))
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        let mut state = self.state();
        state.journal.push("destroy_shader_module".to_string());
        state.release(module.as_raw(), "shader_module");
    }

    fn create_graphics_pipeline(&self, create_info: &vk::GraphicsPipelineCreateInfo) -> BackendResult<vk::Pipeline> {
        let mut state = self.state();
        state.call("create_graphics_pipeline")?;
        // SAFETY: every pointer comes from a builder whose backing state outlives this call.
        unsafe {
            for stage in slice(create_info.p_stages, create_info.stage_count) {
                state.require_live(stage.module.as_raw(), "shader_module", "create_graphics_pipeline");
            }
            if let Some(raster) = create_info.p_rasterization_state.as_ref() {
                state.pipeline_state = Some((create_info.stage_count, raster.cull_mode, raster.front_face));
            }
        }
        state.require_live(create_info.layout.as_raw(), "pipeline_layout", "create_graphics_pipeline");
        Ok(vk::Pipeline::from_raw(state.create("pipeline")))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        let mut state = self.state();
        state.journal.push("destroy_pipeline".to_string());
        state.release(pipeline.as_raw(), "pipeline");
    }

    fn create_framebuffer(&self, create_info: &vk::FramebufferCreateInfo) -> BackendResult<vk::Framebuffer> {
        let mut state = self.state();
        state.call("create_framebuffer")?;
        // SAFETY: the attachment array comes from a builder that outlives this call.
        let attachments = unsafe { slice(create_info.p_attachments, create_info.attachment_count) }.to_vec();
        state.framebuffer_attachments.push(attachments);
        Ok(vk::Framebuffer::from_raw(state.create("framebuffer")))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let mut state = self.state();
        state.journal.push("destroy_framebuffer".to_string());
        state.release(framebuffer.as_raw(), "framebuffer");
    }

    fn create_command_pool(&self, _create_info: &vk::CommandPoolCreateInfo) -> BackendResult<vk::CommandPool> {
        let mut state = self.state();
        state.call("create_command_pool")?;
        Ok(vk::CommandPool::from_raw(state.create("command_pool")))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut state = self.state();
        state.journal.push("destroy_command_pool".to_string());
        state.release(pool.as_raw(), "command_pool");
    }

    fn allocate_command_buffers(
        &self,
        allocate_info: &vk::CommandBufferAllocateInfo,
    ) -> BackendResult<Vec<vk::CommandBuffer>> {
        let mut state = self.state();
        state.call("allocate_command_buffers")?;
        state.require_live(allocate_info.command_pool.as_raw(), "command_pool", "allocate_command_buffers");
        // Freed with their pool, so not tracked individually
        let first = state.next_handle;
        state.next_handle += u64::from(allocate_info.command_buffer_count);
        Ok((first..state.next_handle).map(vk::CommandBuffer::from_raw).collect())
    }

    fn begin_command_buffer(
        &self,
        _command_buffer: vk::CommandBuffer,
        _begin_info: &vk::CommandBufferBeginInfo,
    ) -> BackendResult<()> {
        self.state().call("begin_command_buffer")
    }

    fn end_command_buffer(&self, _command_buffer: vk::CommandBuffer) -> BackendResult<()> {
        self.state().call("end_command_buffer")
    }

    fn cmd_begin_render_pass(
        &self,
        _command_buffer: vk::CommandBuffer,
        begin_info: &vk::RenderPassBeginInfo,
        _contents: vk::SubpassContents,
    ) {
        let mut state = self.state();
        state.journal.push("cmd_begin_render_pass".to_string());
        // SAFETY: the clear values come from a builder that outlives this call;
        // the render pass has a single color attachment, so `color` is the active member.
        unsafe {
            if let Some(clear) = slice(begin_info.p_clear_values, begin_info.clear_value_count).first() {
                state.clear_colors.push(clear.color.float32);
            }
        }
    }

    fn cmd_end_render_pass(&self, _command_buffer: vk::CommandBuffer) {
        self.state().journal.push("cmd_end_render_pass".to_string());
    }

    fn cmd_bind_pipeline(
        &self,
        _command_buffer: vk::CommandBuffer,
        _bind_point: vk::PipelineBindPoint,
        _pipeline: vk::Pipeline,
    ) {
        self.state().journal.push("cmd_bind_pipeline".to_string());
    }

    fn cmd_draw(
        &self,
        command_buffer: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        let mut state = self.state();
        state.journal.push("cmd_draw".to_string());
        state
            .draws
            .push((command_buffer, [vertex_count, instance_count, first_vertex, first_instance]));
    }

    fn create_semaphore(&self, _create_info: &vk::SemaphoreCreateInfo) -> BackendResult<vk::Semaphore> {
        let mut state = self.state();
        state.call("create_semaphore")?;
        Ok(vk::Semaphore::from_raw(state.create("semaphore")))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        let mut state = self.state();
        state.journal.push("destroy_semaphore".to_string());
        state.signalled.remove(&semaphore.as_raw());
        state.release(semaphore.as_raw(), "semaphore");
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout: u64,
        semaphore: vk::Semaphore,
        _fence: vk::Fence,
    ) -> BackendResult<(u32, bool)> {
        let mut state = self.state();
        state.call("acquire_next_image")?;
        state.require_live(swapchain.as_raw(), "swapchain", "acquire_next_image");
        state.signal(semaphore, "acquire_next_image");

        let count = state.swapchain_images.len().max(1);
        let index = state.next_image % count;
        state.next_image += 1;
        Ok((index as u32, false))
    }

    fn queue_submit(&self, _queue: vk::Queue, submits: &[vk::SubmitInfo], _fence: vk::Fence) -> BackendResult<()> {
        let mut state = self.state();
        state.call("queue_submit")?;
        for submit in submits {
            // SAFETY: the arrays come from a builder that outlives this call.
            unsafe {
                for semaphore in slice(submit.p_wait_semaphores, submit.wait_semaphore_count) {
                    state.wait(*semaphore, "queue_submit");
                }
                for buffer in slice(submit.p_command_buffers, submit.command_buffer_count) {
                    state.submitted_buffers.push(*buffer);
                }
                for semaphore in slice(submit.p_signal_semaphores, submit.signal_semaphore_count) {
                    state.signal(*semaphore, "queue_submit");
                }
            }
        }
        Ok(())
    }

    fn queue_present(&self, _queue: vk::Queue, present_info: &vk::PresentInfoKHR) -> BackendResult<bool> {
        let mut state = self.state();
        state.call("queue_present")?;
        // SAFETY: the arrays come from a builder that outlives this call.
        unsafe {
            for semaphore in slice(present_info.p_wait_semaphores, present_info.wait_semaphore_count) {
                state.wait(*semaphore, "queue_present");
            }
            let indices = slice(present_info.p_image_indices, present_info.swapchain_count).to_vec();
            state.presented_images.extend(indices);
        }
        Ok(false)
    }
}

/// Simulated window that asks to close after a fixed number of polls
pub struct SimulatedWindow {
    state: SharedState,
    frames: u32,
    polls: u32,
    vulkan: bool,
    extensions: Option<Vec<String>>,
}

impl SimulatedWindow {
    pub fn new(state: &SharedState, frames: u32) -> Self {
        Self {
            state: Rc::clone(state),
            frames,
            polls: 0,
            vulkan: true,
            extensions: Some(vec!["VK_KHR_surface".to_string(), "VK_KHR_xcb_surface".to_string()]),
        }
    }

    pub fn without_vulkan(mut self) -> Self {
        self.vulkan = false;
        self
    }

    pub fn without_extensions(mut self) -> Self {
        self.extensions = None;
        self
    }
}

impl WindowSystem for SimulatedWindow {
    fn vulkan_supported(&self) -> bool {
        self.vulkan
    }

    fn required_instance_extensions(&self) -> Option<Vec<String>> {
        self.extensions.clone()
    }

    fn create_surface(&self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut state = self.state.borrow_mut();
        state
            .call("create_surface")
            .map_err(|e| WindowError::GlfwError(format!("{e:?}")))?;
        state.require_live(instance.as_raw(), "instance", "create_surface");
        Ok(vk::SurfaceKHR::from_raw(state.create("surface")))
    }

    fn poll_events(&mut self) {
        self.polls += 1;
        self.state.borrow_mut().journal.push("poll_events".to_string());
    }

    fn should_close(&self) -> bool {
        self.polls >= self.frames
    }
}

impl Drop for SimulatedWindow {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.instance.is_some() {
            state.violations.push("window dropped before instance".to_string());
        }
        state.journal.push("window_dropped".to_string());
    }
}

/// In-memory SPIR-V
pub struct StaticShaders {
    vertex: Vec<u8>,
    fragment: Vec<u8>,
}

impl StaticShaders {
    /// Word-aligned blobs starting with the SPIR-V magic number
    pub fn triangle() -> Self {
        let blob = |tag: u32| -> Vec<u8> {
            [0x0723_0203_u32, 0x0001_0000, tag]
                .iter()
                .flat_map(|word| word.to_le_bytes())
                .collect()
        };
        Self {
            vertex: blob(1),
            fragment: blob(2),
        }
    }

    /// Same bytes for both stages
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            vertex: bytes.clone(),
            fragment: bytes,
        }
    }
}

impl ShaderSource for StaticShaders {
    fn bytecode(&self, stage: ShaderStage) -> std::io::Result<Vec<u8>> {
        Ok(match stage {
            ShaderStage::Vertex => self.vertex.clone(),
            ShaderStage::Fragment => self.fragment.clone(),
        })
    }
}

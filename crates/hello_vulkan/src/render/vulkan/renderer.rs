//! Vulkan renderer lifecycle
//!
//! [`VulkanRenderer`] owns every bootstrap stage in its own slot and is the
//! only place that knows the destruction order. A bootstrap that fails part
//! way leaves the finished stages in their slots; dropping the renderer
//! then unwinds exactly those.

use super::backend::GraphicsBackend;
use super::context::{Surface, VulkanError, VulkanInstance, VulkanResult};
use super::device::{DeviceSelector, LogicalDevice, SelectedDevice};
use super::framebuffer::RenderTarget;
use super::scheduler::FrameScheduler;
use super::shader::ShaderSource;
use super::swapchain::PresentationChain;
use super::window::WindowSystem;
use crate::config::RendererConfig;

/// Vulkan context, presentation chain and frame loop for one window
pub struct VulkanRenderer<B: GraphicsBackend, W: WindowSystem> {
    backend: B,
    window: Option<W>,
    instance: Option<VulkanInstance>,
    surface: Option<Surface>,
    selected_device: Option<SelectedDevice>,
    device: Option<LogicalDevice>,
    chain: Option<PresentationChain>,
    target: Option<RenderTarget>,
    scheduler: Option<FrameScheduler>,
}

impl<B: GraphicsBackend, W: WindowSystem> VulkanRenderer<B, W> {
    /// Bring up every stage in order
    ///
    /// Stops at the first failure; whatever was created before it is
    /// destroyed in reverse order before the error is returned.
    pub fn bootstrap<S>(backend: B, window: W, config: &RendererConfig, shaders: &S) -> VulkanResult<Self>
    where
        S: ShaderSource + ?Sized,
    {
        let mut renderer = Self {
            backend,
            window: Some(window),
            instance: None,
            surface: None,
            selected_device: None,
            device: None,
            chain: None,
            target: None,
            scheduler: None,
        };

        // On error `renderer` is dropped here, which runs the teardown.
        renderer.build(config, shaders)?;

        log::info!("Vulkan bootstrap complete");
        Ok(renderer)
    }

    fn build<S: ShaderSource + ?Sized>(&mut self, config: &RendererConfig, shaders: &S) -> VulkanResult<()> {
        let window = self.window.as_ref().ok_or(VulkanError::BackendUnsupported)?;

        let instance = self
            .instance
            .insert(VulkanInstance::new(&mut self.backend, window, config)?);
        let surface = self.surface.insert(Surface::new(window, instance)?);
        let selected = self
            .selected_device
            .insert(DeviceSelector::select(&self.backend, surface)?);
        let device = self.device.insert(LogicalDevice::new(&mut self.backend, selected)?);
        let chain = self.chain.insert(PresentationChain::new(
            &self.backend,
            surface,
            selected,
            device,
            config.window,
        )?);
        let target = self.target.insert(RenderTarget::new(&self.backend, chain, shaders)?);
        self.scheduler = Some(FrameScheduler::new(&self.backend, device, target)?);

        Ok(())
    }

    /// Run the frame loop until the window closes
    ///
    /// Returns the number of frames drawn.
    pub fn run(&mut self) -> VulkanResult<u64> {
        let (Some(window), Some(device), Some(chain), Some(scheduler)) =
            (self.window.as_mut(), &self.device, &self.chain, self.scheduler.as_mut())
        else {
            return Err(VulkanError::FrameSubmissionFailed(ash::vk::Result::ERROR_INITIALIZATION_FAILED));
        };

        scheduler.run(&self.backend, window, device, chain)
    }

    /// Draw a single frame; returns the presented image index
    pub fn draw_frame(&mut self) -> VulkanResult<u32> {
        let (Some(device), Some(chain), Some(scheduler)) = (&self.device, &self.chain, self.scheduler.as_mut()) else {
            return Err(VulkanError::FrameSubmissionFailed(ash::vk::Result::ERROR_INITIALIZATION_FAILED));
        };

        scheduler.draw_frame(&self.backend, device, chain)
    }

    /// Destroy everything in reverse creation order
    ///
    /// Idempotent; also runs on drop. The window goes last.
    pub fn teardown(&mut self) {
        if self.window.is_none() && self.instance.is_none() {
            return;
        }

        if self.device.is_some() {
            if let Err(e) = self.backend.device_wait_idle() {
                log::warn!("device_wait_idle failed during teardown: {:?}", e);
            }
        }

        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.destroy(&self.backend);
        }
        if let Some(mut target) = self.target.take() {
            target.destroy(&self.backend);
        }
        if let Some(mut chain) = self.chain.take() {
            chain.destroy(&self.backend);
        }
        if let Some(mut device) = self.device.take() {
            device.destroy(&mut self.backend);
        }
        self.selected_device = None;
        if let Some(mut surface) = self.surface.take() {
            surface.destroy(&self.backend);
        }
        if let Some(mut instance) = self.instance.take() {
            instance.destroy(&mut self.backend);
        }
        if self.window.take().is_some() {
            log::debug!("Window destroyed");
        }

        log::info!("Vulkan teardown complete");
    }

    /// Graphics backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Window, until teardown releases it
    pub fn window(&self) -> Option<&W> {
        self.window.as_ref()
    }

    /// Physical device chosen during bootstrap
    pub fn selected_device(&self) -> Option<&SelectedDevice> {
        self.selected_device.as_ref()
    }

    /// Logical device, once created
    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    /// Swapchain and its image views, once created
    pub fn presentation_chain(&self) -> Option<&PresentationChain> {
        self.chain.as_ref()
    }

    /// Render pass, pipeline and framebuffers, once created
    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    /// Draw loop state, once created
    pub fn frame_scheduler(&self) -> Option<&FrameScheduler> {
        self.scheduler.as_ref()
    }
}

impl<B: GraphicsBackend, W: WindowSystem> Drop for VulkanRenderer<B, W> {
    fn drop(&mut self) {
        self.teardown();
    }
}

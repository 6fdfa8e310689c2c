//! Per-frame submission
//!
//! Command buffers are recorded once, one per framebuffer, since the scene
//! never changes. Each frame then waits for the present queue to drain,
//! acquires an image, submits the matching buffer and presents it.

use ash::vk;

use super::backend::GraphicsBackend;
use super::commands::{CommandPool, CommandRecorder};
use super::context::{VulkanError, VulkanResult};
use super::device::LogicalDevice;
use super::framebuffer::RenderTarget;
use super::swapchain::PresentationChain;
use super::sync::FrameSync;
use super::window::WindowSystem;

/// Opaque black
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Recorded command buffers plus the semaphores that order a frame
pub struct FrameScheduler {
    command_pool: CommandPool,
    sync: Option<FrameSync>,
    frames_drawn: u64,
}

impl FrameScheduler {
    /// Create the pool on the graphics family, record every buffer and
    /// create the frame semaphores
    pub fn new<B: GraphicsBackend>(backend: &B, device: &LogicalDevice, target: &RenderTarget) -> VulkanResult<Self> {
        let mut scheduler = Self {
            command_pool: CommandPool::new(backend, device.graphics_family())?,
            sync: None,
            frames_drawn: 0,
        };

        let prepared = scheduler
            .record_command_buffers(backend, target)
            .and_then(|()| FrameSync::new(backend));

        match prepared {
            Ok(sync) => {
                scheduler.sync = Some(sync);
                Ok(scheduler)
            }
            Err(e) => {
                scheduler.destroy(backend);
                Err(e)
            }
        }
    }

    fn record_command_buffers<B: GraphicsBackend>(&mut self, backend: &B, target: &RenderTarget) -> VulkanResult<()> {
        let framebuffers = target.framebuffers().handles();
        let command_buffers = self
            .command_pool
            .allocate_command_buffers(backend, framebuffers.len() as u32)?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: CLEAR_COLOR },
        }];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: target.extent(),
        };

        for (&command_buffer, &framebuffer) in command_buffers.iter().zip(framebuffers) {
            let mut recorder = CommandRecorder::begin(backend, command_buffer)?;
            {
                let mut pass = recorder.begin_render_pass(target.render_pass(), framebuffer, render_area, &clear_values);
                pass.bind_pipeline(target.pipeline());
                pass.draw(3, 1, 0, 0);
            }
            recorder.end()?;
        }

        log::debug!("Recorded {} command buffers", command_buffers.len());
        Ok(())
    }

    /// Draw one frame; returns the presented image index
    pub fn draw_frame<B: GraphicsBackend>(
        &mut self,
        backend: &B,
        device: &LogicalDevice,
        chain: &PresentationChain,
    ) -> VulkanResult<u32> {
        let sync = self
            .sync
            .as_ref()
            .ok_or(VulkanError::FrameSubmissionFailed(vk::Result::ERROR_INITIALIZATION_FAILED))?;

        // Single frame in flight: the previous present must be finished
        // before its semaphores and command buffer are reused.
        backend
            .queue_wait_idle(device.present_queue())
            .map_err(VulkanError::FrameSubmissionFailed)?;

        let (image_index, suboptimal) = backend
            .acquire_next_image(chain.handle(), u64::MAX, sync.image_available(), vk::Fence::null())
            .map_err(VulkanError::FrameSubmissionFailed)?;
        if suboptimal {
            log::debug!("Acquired image {} from a suboptimal swapchain", image_index);
        }

        let command_buffer = self
            .command_pool
            .command_buffers()
            .get(image_index as usize)
            .copied()
            .ok_or(VulkanError::FrameSubmissionFailed(vk::Result::ERROR_OUT_OF_DATE_KHR))?;

        let wait_semaphores = [sync.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [sync.render_finished()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        backend
            .queue_submit(device.graphics_queue(), &[submit_info], vk::Fence::null())
            .map_err(VulkanError::FrameSubmissionFailed)?;

        let swapchains = [chain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let suboptimal = backend
            .queue_present(device.present_queue(), &present_info)
            .map_err(VulkanError::PresentationFailed)?;
        if suboptimal {
            log::debug!("Presented image {} to a suboptimal swapchain", image_index);
        }

        self.frames_drawn += 1;
        Ok(image_index)
    }

    /// Draw until the window asks to close, then wait for the device
    ///
    /// Returns the number of frames drawn by this call.
    pub fn run<B, W>(
        &mut self,
        backend: &B,
        window: &mut W,
        device: &LogicalDevice,
        chain: &PresentationChain,
    ) -> VulkanResult<u64>
    where
        B: GraphicsBackend,
        W: WindowSystem,
    {
        let start = self.frames_drawn;

        while !window.should_close() {
            window.poll_events();
            self.draw_frame(backend, device, chain)?;
        }

        backend.device_wait_idle().map_err(VulkanError::Api)?;

        let frames = self.frames_drawn - start;
        log::info!("Frame loop finished after {} frames", frames);
        Ok(frames)
    }

    /// Total frames drawn so far
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Recorded command buffers, one per swapchain image
    pub fn command_buffers(&self) -> &[vk::CommandBuffer] {
        self.command_pool.command_buffers()
    }

    /// Semaphores first, then the command pool
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        if let Some(mut sync) = self.sync.take() {
            log::debug!("Destroying frame semaphores");
            sync.destroy(backend);
        }
        self.command_pool.destroy(backend);
    }
}

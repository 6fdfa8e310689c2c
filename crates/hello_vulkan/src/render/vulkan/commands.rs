//! Command buffer management
//!
//! Type-safe command buffer recording: a [`CommandRecorder`] only exists
//! between begin and end, and an [`ActiveRenderPass`] ends its pass when it
//! goes out of scope.

use ash::vk;

use super::backend::GraphicsBackend;
use super::context::{VulkanError, VulkanResult};

/// Command pool and the buffers allocated from it
pub struct CommandPool {
    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
}

impl CommandPool {
    /// Create a new command pool on `queue_family_index`
    pub fn new<B: GraphicsBackend>(backend: &B, queue_family_index: u32) -> VulkanResult<Self> {
        // Buffers are recorded once and never reset
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::empty())
            .queue_family_index(queue_family_index);

        let command_pool = backend
            .create_command_pool(&pool_create_info)
            .map_err(VulkanError::CommandPoolOrBufferCreationFailed)?;

        Ok(Self {
            command_pool,
            command_buffers: Vec::new(),
        })
    }

    /// Allocate `count` primary command buffers
    pub fn allocate_command_buffers<B: GraphicsBackend>(
        &mut self,
        backend: &B,
        count: u32,
    ) -> VulkanResult<&[vk::CommandBuffer]> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = backend
            .allocate_command_buffers(&alloc_info)
            .map_err(VulkanError::CommandPoolOrBufferCreationFailed)?;
        self.command_buffers.extend(buffers);

        Ok(&self.command_buffers)
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Buffers allocated from the pool, one per framebuffer
    pub fn command_buffers(&self) -> &[vk::CommandBuffer] {
        &self.command_buffers
    }

    /// Destroy the pool, which frees every buffer allocated from it
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        self.command_buffers.clear();
        if self.command_pool != vk::CommandPool::null() {
            log::debug!("Destroying command pool");
            backend.destroy_command_pool(self.command_pool);
            self.command_pool = vk::CommandPool::null();
        }
    }
}

/// Command buffer in the recording state
pub struct CommandRecorder<'a, B: GraphicsBackend> {
    backend: &'a B,
    command_buffer: vk::CommandBuffer,
}

impl<'a, B: GraphicsBackend> CommandRecorder<'a, B> {
    /// Begin command recording
    pub fn begin(backend: &'a B, command_buffer: vk::CommandBuffer) -> VulkanResult<Self> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::empty());

        backend
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(VulkanError::CommandPoolOrBufferCreationFailed)?;

        Ok(Self { backend, command_buffer })
    }

    /// Begin render pass
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> ActiveRenderPass<'_, 'a, B> {
        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        self.backend
            .cmd_begin_render_pass(self.command_buffer, &render_pass_begin, vk::SubpassContents::INLINE);

        ActiveRenderPass { recorder: self }
    }

    /// End command recording
    pub fn end(self) -> VulkanResult<vk::CommandBuffer> {
        self.backend
            .end_command_buffer(self.command_buffer)
            .map_err(VulkanError::CommandPoolOrBufferCreationFailed)?;

        Ok(self.command_buffer)
    }
}

/// Render pass being recorded; ends the pass on drop
pub struct ActiveRenderPass<'r, 'a, B: GraphicsBackend> {
    recorder: &'r mut CommandRecorder<'a, B>,
}

impl<B: GraphicsBackend> ActiveRenderPass<'_, '_, B> {
    /// Bind graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.recorder
            .backend
            .cmd_bind_pipeline(self.recorder.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
    }

    /// Non-indexed draw
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.recorder.backend.cmd_draw(
            self.recorder.command_buffer,
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        );
    }
}

impl<B: GraphicsBackend> Drop for ActiveRenderPass<'_, '_, B> {
    fn drop(&mut self) {
        self.recorder.backend.cmd_end_render_pass(self.recorder.command_buffer);
    }
}

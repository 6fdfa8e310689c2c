//! Render pass management
//!
//! A single color attachment cleared at the start of the pass and handed
//! to the presentation engine at the end.

use ash::vk;

use super::backend::GraphicsBackend;
use super::context::{VulkanError, VulkanResult};

/// Render pass handle
pub struct RenderPass {
    render_pass: vk::RenderPass,
}

impl RenderPass {
    /// Create the presenting pass for `color_format`
    pub fn new<B: GraphicsBackend>(backend: &B, color_format: vk::Format) -> VulkanResult<Self> {
        // Color attachment description
        let color_attachment = vk::AttachmentDescription::builder()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build();

        let attachments = [color_attachment];

        let color_attachment_ref = vk::AttachmentReference::builder()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .build();

        let color_attachments = [color_attachment_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachments)
            .build();

        let subpasses = [subpass];

        // Hold the color write until the acquired image is actually available
        let dependency = vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .build();

        let dependencies = [dependency];

        let render_pass_create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = backend
            .create_render_pass(&render_pass_create_info)
            .map_err(VulkanError::RenderPassCreationFailed)?;

        log::debug!("Render pass created for {:?}", color_format);
        Ok(Self { render_pass })
    }

    /// Get the render pass handle
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Destroy the render pass
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        if self.render_pass != vk::RenderPass::null() {
            log::debug!("Destroying render pass");
            backend.destroy_render_pass(self.render_pass);
            self.render_pass = vk::RenderPass::null();
        }
    }
}

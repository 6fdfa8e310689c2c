//! Framebuffer management
//!
//! One framebuffer per swapchain image view, plus [`RenderTarget`], which
//! groups everything a frame renders into.

use ash::vk;

use super::backend::GraphicsBackend;
use super::context::{VulkanError, VulkanResult};
use super::render_pass::RenderPass;
use super::shader::{GraphicsPipeline, ShaderSource};
use super::swapchain::PresentationChain;

/// Framebuffers, indexed like the swapchain images
#[derive(Default)]
pub struct Framebuffers {
    framebuffers: Vec<vk::Framebuffer>,
}

impl Framebuffers {
    /// Create one framebuffer for each view in `image_views`
    pub fn new<B: GraphicsBackend>(
        backend: &B,
        render_pass: vk::RenderPass,
        image_views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let mut created = Self::default();

        for view in image_views {
            let attachments = [*view];
            let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            match backend.create_framebuffer(&framebuffer_create_info) {
                Ok(framebuffer) => created.framebuffers.push(framebuffer),
                Err(e) => {
                    created.destroy(backend);
                    return Err(VulkanError::FramebufferCreationFailed(e));
                }
            }
        }

        Ok(created)
    }

    /// Framebuffer handles, in swapchain image order
    pub fn handles(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }

    /// Number of framebuffers
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether no framebuffers were created
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    /// Destroy every framebuffer
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        if !self.framebuffers.is_empty() {
            log::debug!("Destroying {} framebuffers", self.framebuffers.len());
        }
        for framebuffer in self.framebuffers.drain(..) {
            backend.destroy_framebuffer(framebuffer);
        }
    }
}

/// Render pass, pipeline and framebuffers for one presentation chain
pub struct RenderTarget {
    render_pass: RenderPass,
    pipeline: Option<GraphicsPipeline>,
    framebuffers: Framebuffers,
    extent: vk::Extent2D,
}

impl RenderTarget {
    /// Build the render pass, pipeline and framebuffers for `chain`
    ///
    /// On failure everything built so far is destroyed.
    pub fn new<B, S>(backend: &B, chain: &PresentationChain, shaders: &S) -> VulkanResult<Self>
    where
        B: GraphicsBackend,
        S: ShaderSource + ?Sized,
    {
        let extent = chain.extent();
        let mut target = Self {
            render_pass: RenderPass::new(backend, chain.format().format)?,
            pipeline: None,
            framebuffers: Framebuffers::default(),
            extent,
        };

        match GraphicsPipeline::new(backend, target.render_pass.handle(), extent, shaders) {
            Ok(pipeline) => target.pipeline = Some(pipeline),
            Err(e) => {
                target.destroy(backend);
                return Err(e);
            }
        }

        match Framebuffers::new(backend, target.render_pass.handle(), chain.image_views(), extent) {
            Ok(framebuffers) => target.framebuffers = framebuffers,
            Err(e) => {
                target.destroy(backend);
                return Err(e);
            }
        }

        log::debug!("Render target ready with {} framebuffers", target.framebuffers.len());
        Ok(target)
    }

    /// Get render pass handle
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    /// Get pipeline handle
    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline.as_ref().map_or(vk::Pipeline::null(), GraphicsPipeline::handle)
    }

    /// One framebuffer per swapchain image
    pub fn framebuffers(&self) -> &Framebuffers {
        &self.framebuffers
    }

    /// Extent the pipeline and framebuffers were built for
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Framebuffers, then pipeline and layout, then render pass
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        self.framebuffers.destroy(backend);
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.destroy(backend);
        }
        self.render_pass.destroy(backend);
    }
}

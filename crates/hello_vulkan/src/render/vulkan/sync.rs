//! Vulkan synchronization primitives for GPU/GPU coordination
//!
//! The renderer keeps exactly one frame in flight, so a frame needs only
//! two binary semaphores and no fence:
//!
//! ```text
//! acquire ──signal──▶ image_available ──wait──▶ submit
//! submit  ──signal──▶ render_finished ──wait──▶ present
//! ```
//!
//! The CPU side is serialised by waiting for the present queue to go idle
//! before each acquire (see [`FrameScheduler`](super::FrameScheduler)),
//! which is also what makes reusing the same pair every frame valid.

use ash::vk;

use super::backend::GraphicsBackend;
use super::context::{VulkanError, VulkanResult};

/// Semaphore pair for the acquire/submit/present chain
pub struct FrameSync {
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
}

impl FrameSync {
    /// Create frame synchronization objects
    pub fn new<B: GraphicsBackend>(backend: &B) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let image_available = backend
            .create_semaphore(&create_info)
            .map_err(VulkanError::SyncPrimitiveCreationFailed)?;

        let render_finished = match backend.create_semaphore(&create_info) {
            Ok(semaphore) => semaphore,
            Err(e) => {
                backend.destroy_semaphore(image_available);
                return Err(VulkanError::SyncPrimitiveCreationFailed(e));
            }
        };

        Ok(Self {
            image_available,
            render_finished,
        })
    }

    /// Signalled by acquire, waited on by submit
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    /// Signalled by submit, waited on by present
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    /// Destroy both semaphores
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        for semaphore in [&mut self.render_finished, &mut self.image_available] {
            if *semaphore != vk::Semaphore::null() {
                backend.destroy_semaphore(*semaphore);
                *semaphore = vk::Semaphore::null();
            }
        }
    }
}

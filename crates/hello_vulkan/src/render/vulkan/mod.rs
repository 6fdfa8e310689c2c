//! Vulkan backend implementation
//!
//! The bootstrap is split into one module per stage, created in this order
//! and destroyed in the reverse one by [`VulkanRenderer`]:
//!
//! - [`context`]: instance, debug report hook and window surface
//! - [`device`]: physical device selection and the logical device
//! - [`swapchain`]: swapchain negotiation and image views
//! - [`render_pass`], [`shader`], [`framebuffer`]: the render target
//! - [`commands`], [`sync`], [`scheduler`]: per-frame submission
//!
//! All driver calls go through [`GraphicsBackend`], so the whole pipeline
//! can run against a simulated driver in tests.

pub mod ash_backend;
pub mod backend;
pub mod commands;
pub mod context;
pub mod device;
pub mod framebuffer;
pub mod render_pass;
pub mod renderer;
pub mod scheduler;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod window;

#[cfg(test)]
pub(crate) mod simulated;

pub use ash_backend::AshBackend;
pub use backend::{BackendResult, GraphicsBackend};
pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use context::{Surface, VulkanError, VulkanInstance, VulkanResult};
pub use device::{
    DeviceSelector, LogicalDevice, PresentationCapabilities, QueueRole, QueueRoleSet, SelectedDevice,
    REQUIRED_DEVICE_EXTENSIONS,
};
pub use framebuffer::{Framebuffers, RenderTarget};
pub use render_pass::RenderPass;
pub use renderer::VulkanRenderer;
pub use scheduler::FrameScheduler;
pub use shader::{GraphicsPipeline, ShaderSource, ShaderStage};
pub use swapchain::PresentationChain;
pub use sync::FrameSync;
pub use window::{Window, WindowError, WindowResult, WindowSystem};

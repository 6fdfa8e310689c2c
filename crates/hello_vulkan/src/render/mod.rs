//! Rendering subsystem
//!
//! Only the Vulkan backend exists; it lives in [`vulkan`].

pub mod vulkan;

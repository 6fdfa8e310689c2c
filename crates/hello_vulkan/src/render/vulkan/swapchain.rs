//! Vulkan swapchain management
//!
//! Negotiates format, present mode, extent, image count and sharing mode
//! from the capabilities captured during device selection, then creates the
//! swapchain and one view per image it actually returns.

use ash::vk;

use super::backend::GraphicsBackend;
use super::context::{Surface, VulkanError, VulkanResult};
use super::device::{LogicalDevice, PresentationCapabilities, SelectedDevice};
use crate::config::WindowConfig;

/// Format used whenever the surface allows it
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Pick the surface format
///
/// A lone `UNDEFINED` entry means the surface takes anything, so the
/// preferred pair is used.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    match formats {
        [] => PREFERRED_SURFACE_FORMAT,
        [only] if only.format == vk::Format::UNDEFINED => PREFERRED_SURFACE_FORMAT,
        [first, ..] => formats
            .iter()
            .copied()
            .find(|sf| {
                sf.format == PREFERRED_SURFACE_FORMAT.format && sf.color_space == PREFERRED_SURFACE_FORMAT.color_space
            })
            .unwrap_or(*first),
    }
}

/// MAILBOX, then FIFO, then IMMEDIATE
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO]
        .into_iter()
        .find(|preferred| modes.contains(preferred))
        .unwrap_or(vk::PresentModeKHR::IMMEDIATE)
}

/// Use the surface's extent, or clamp the window size into its limits
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window: WindowConfig) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;

    // max-then-min instead of `clamp`, which panics when min > max.
    vk::Extent2D {
        width: window.width.max(min.width).min(max.width),
        height: window.height.max(min.height).min(max.height),
    }
}

/// One more than the minimum, bounded by the maximum when there is one
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count.saturating_add(1);
    if capabilities.max_image_count != 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Sharing mode and the family list that goes with it
pub fn image_sharing(graphics_family: u32, present_family: u32) -> (vk::SharingMode, Vec<u32>) {
    if graphics_family == present_family {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (vk::SharingMode::CONCURRENT, vec![graphics_family, present_family])
    }
}

/// Swapchain, its images and one view per image
pub struct PresentationChain {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
}

impl PresentationChain {
    /// Create a new swapchain
    pub fn new<B: GraphicsBackend>(
        backend: &B,
        surface: &Surface,
        selected: &SelectedDevice,
        device: &LogicalDevice,
        window: WindowConfig,
    ) -> VulkanResult<Self> {
        let PresentationCapabilities {
            capabilities,
            formats,
            present_modes,
        } = &selected.capabilities;

        let format = choose_surface_format(formats);
        let present_mode = choose_present_mode(present_modes);
        let extent = choose_extent(capabilities, window);
        let image_count = choose_image_count(capabilities);
        let (sharing_mode, family_indices) = image_sharing(device.graphics_family(), device.present_family());

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&family_indices)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = backend
            .create_swapchain(&swapchain_create_info)
            .map_err(VulkanError::SwapchainCreationFailed)?;

        let mut chain = Self {
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format,
            present_mode,
            extent,
        };

        // Objects created so far go away with `chain` on any error below.
        chain.images = match backend.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                chain.destroy(backend);
                return Err(VulkanError::SwapchainCreationFailed(e));
            }
        };

        for index in 0..chain.images.len() {
            match Self::create_view(backend, chain.images[index], format.format) {
                Ok(view) => chain.image_views.push(view),
                Err(e) => {
                    chain.destroy(backend);
                    return Err(VulkanError::ImageViewCreationFailed(e));
                }
            }
        }

        log::info!(
            "Swapchain created: {:?}/{:?}, {:?}, {}x{}, {} images (requested {})",
            format.format,
            format.color_space,
            present_mode,
            extent.width,
            extent.height,
            chain.images.len(),
            image_count
        );

        Ok(chain)
    }

    fn create_view<B: GraphicsBackend>(
        backend: &B,
        image: vk::Image,
        format: vk::Format,
    ) -> Result<vk::ImageView, vk::Result> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        backend.create_image_view(&create_info)
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Negotiated surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Negotiated present mode
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Negotiated image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of images the swapchain actually returned
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// One view per swapchain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Destroy the image views, then the swapchain; safe to call more than once
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        if !self.image_views.is_empty() {
            log::debug!("Destroying {} image views", self.image_views.len());
        }
        for view in self.image_views.drain(..) {
            backend.destroy_image_view(view);
        }

        if self.swapchain != vk::SwapchainKHR::null() {
            log::debug!("Destroying swapchain");
            backend.destroy_swapchain(self.swapchain);
            self.swapchain = vk::SwapchainKHR::null();
        }
        self.images.clear();
    }
}

//! Physical device selection and logical device creation
//!
//! The first enumerated device that advertises every required extension,
//! offers at least one surface format and present mode, and has both a
//! graphics and a presenting queue family wins. There is no scoring.

use ash::vk;
use std::os::raw::c_char;

use super::backend::{name_to_string, GraphicsBackend};
use super::context::{to_cstrings, Surface, VulkanError, VulkanResult};

/// Device extensions every candidate must advertise
pub const REQUIRED_DEVICE_EXTENSIONS: [&str; 2] = ["VK_KHR_swapchain", "VK_KHR_portability_subset"];

/// Queue capabilities the renderer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRole {
    /// Records and submits draw commands
    Graphics,
    /// Presents swapchain images to the surface
    Present,
}

impl QueueRole {
    /// Every role, in slot order
    pub const ALL: [QueueRole; 2] = [QueueRole::Graphics, QueueRole::Present];

    fn slot(self) -> usize {
        match self {
            QueueRole::Graphics => 0,
            QueueRole::Present => 1,
        }
    }
}

/// Queue family index per role
///
/// First match wins: once a role holds a family, later assignments for it
/// are ignored. Both roles may hold the same family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueRoleSet {
    families: [Option<u32>; 2],
}

impl QueueRoleSet {
    /// Empty set with no family assigned
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `family` for `role` unless the role is already assigned
    ///
    /// Returns whether the assignment took effect.
    pub fn assign(&mut self, role: QueueRole, family: u32) -> bool {
        let slot = &mut self.families[role.slot()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(family);
        true
    }

    /// Family index assigned to `role`
    pub fn index(&self, role: QueueRole) -> Option<u32> {
        self.families[role.slot()]
    }

    /// Whether a family has been chosen for `role`
    pub fn is_assigned(&self, role: QueueRole) -> bool {
        self.index(role).is_some()
    }

    /// Whether every role holds a family
    pub fn is_complete(&self) -> bool {
        self.families.iter().all(Option::is_some)
    }

    /// Distinct family indices in role order
    pub fn unique_families(&self) -> Vec<u32> {
        let mut unique = Vec::with_capacity(self.families.len());
        for family in self.families.iter().flatten() {
            if !unique.contains(family) {
                unique.push(*family);
            }
        }
        unique
    }
}

/// Surface support details for one physical device
#[derive(Debug, Clone, Default)]
pub struct PresentationCapabilities {
    /// Surface limits for this device
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats, in driver order
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes, in driver order
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl PresentationCapabilities {
    /// Query everything the swapchain negotiation needs
    pub fn query<B: GraphicsBackend>(
        backend: &B,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self, vk::Result> {
        Ok(Self {
            capabilities: backend.surface_capabilities(device, surface)?,
            formats: backend.surface_formats(device, surface)?,
            present_modes: backend.surface_present_modes(device, surface)?,
        })
    }

    /// A surface is usable once it offers a format and a present mode
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// The device picked by [`DeviceSelector`]
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    /// Physical device handle
    pub physical_device: vk::PhysicalDevice,
    /// Properties reported by the driver
    pub properties: vk::PhysicalDeviceProperties,
    /// Families chosen for graphics and present
    pub queue_roles: QueueRoleSet,
    /// Presentation support queried during selection
    pub capabilities: PresentationCapabilities,
}

impl SelectedDevice {
    /// Device name as reported by the driver
    pub fn name(&self) -> String {
        name_to_string(&self.properties.device_name)
    }
}

/// Physical device selection
pub struct DeviceSelector;

impl DeviceSelector {
    /// Pick the first suitable physical device for `surface`
    pub fn select<B: GraphicsBackend>(backend: &B, surface: &Surface) -> VulkanResult<SelectedDevice> {
        let devices = backend.enumerate_physical_devices().map_err(VulkanError::Api)?;

        if devices.is_empty() {
            log::error!("No Vulkan capable devices found");
            return Err(VulkanError::DeviceNotFound);
        }

        for device in devices {
            let properties = backend.physical_device_properties(device);
            // Queried for diagnostics only; selection needs no features.
            let features = backend.physical_device_features(device);
            let name = name_to_string(&properties.device_name);

            log::info!(
                "Candidate GPU: {} (vendor 0x{:04x}, device 0x{:04x})",
                name,
                properties.vendor_id,
                properties.device_id
            );
            log::trace!("{} features: {:?}", name, features);

            match Self::evaluate_device(backend, device, surface.handle()) {
                Ok((queue_roles, capabilities)) => {
                    log::info!("Selected GPU: {}", name);
                    return Ok(SelectedDevice {
                        physical_device: device,
                        properties,
                        queue_roles,
                        capabilities,
                    });
                }
                Err(reason) => log::debug!("Rejected {}: {}", name, reason),
            }
        }

        Err(VulkanError::DeviceNotFound)
    }

    /// Run the suitability checks, stopping at the first failure
    fn evaluate_device<B: GraphicsBackend>(
        backend: &B,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<(QueueRoleSet, PresentationCapabilities), String> {
        let available = backend
            .device_extensions(device)
            .map_err(|e| format!("extension query failed: {e:?}"))?;

        if let Some(missing) = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .find(|required| !available.iter().any(|name| name == *required))
        {
            return Err(format!("missing device extension {missing}"));
        }

        let capabilities = PresentationCapabilities::query(backend, device, surface)
            .map_err(|e| format!("surface query failed: {e:?}"))?;

        if !capabilities.is_adequate() {
            return Err("no surface formats or present modes".to_string());
        }

        let queue_roles = Self::find_queue_families(backend, device, surface);
        if !queue_roles.is_complete() {
            return Err("missing graphics or present queue family".to_string());
        }

        Ok((queue_roles, capabilities))
    }

    /// Assign queue roles scanning families in index order
    pub fn find_queue_families<B: GraphicsBackend>(
        backend: &B,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> QueueRoleSet {
        let mut roles = QueueRoleSet::new();

        for (index, family) in backend.queue_families(device).iter().enumerate() {
            if family.queue_count == 0 {
                continue;
            }
            let index = index as u32;

            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                roles.assign(QueueRole::Graphics, index);
            }

            // A failed query counts as no support.
            if backend.surface_support(device, index, surface).unwrap_or(false) {
                roles.assign(QueueRole::Present, index);
            }

            if roles.is_complete() {
                break;
            }
        }

        roles
    }
}

/// Logical device and its queues
///
/// The graphics and present queues are the same handle when both roles
/// share a family.
pub struct LogicalDevice {
    handle: vk::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    graphics_family: u32,
    present_family: u32,
}

impl LogicalDevice {
    /// Create the device with one queue per distinct family
    pub fn new<B: GraphicsBackend>(backend: &mut B, selected: &SelectedDevice) -> VulkanResult<Self> {
        let roles = &selected.queue_roles;
        let graphics_family = roles.index(QueueRole::Graphics).ok_or(VulkanError::DeviceNotFound)?;
        let present_family = roles.index(QueueRole::Present).ok_or(VulkanError::DeviceNotFound)?;

        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = roles
            .unique_families()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extensions = to_cstrings(REQUIRED_DEVICE_EXTENSIONS, |_| {
            VulkanError::LogicalDeviceCreationFailed(vk::Result::ERROR_EXTENSION_NOT_PRESENT)
        })?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

        let device_features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&device_features);

        let handle = backend
            .create_device(selected.physical_device, &create_info)
            .map_err(VulkanError::LogicalDeviceCreationFailed)?;

        let graphics_queue = backend.device_queue(graphics_family, 0);
        let present_queue = backend.device_queue(present_family, 0);

        log::info!(
            "Logical device created (graphics family {}, present family {})",
            graphics_family,
            present_family
        );

        Ok(Self {
            handle,
            graphics_queue,
            present_queue,
            graphics_family,
            present_family,
        })
    }

    /// Get device handle
    pub fn handle(&self) -> vk::Device {
        self.handle
    }

    /// Queue used for draw submission
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Queue used for presentation
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Graphics queue family index
    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }

    /// Present queue family index
    pub fn present_family(&self) -> u32 {
        self.present_family
    }

    /// Destroy the device; safe to call more than once
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &mut B) {
        if self.handle != vk::Device::null() {
            log::debug!("Destroying logical device");
            backend.destroy_device();
            self.handle = vk::Device::null();
        }
    }
}

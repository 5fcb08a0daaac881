use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ash::khr;
use ash::vk;
use log::warn;

use crate::error::{GfxError, GfxResult};
use crate::queue::FenceValue;
use crate::swapchain::{SwapChain, SwapChainDescriptor, SwapChainResetEvent};
use crate::types::{Extent2D, Format};

pub(crate) fn to_vk_format(format: Format) -> vk::Format {
    match format {
        Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::R16G16B16A16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        Format::D32Sfloat => vk::Format::D32_SFLOAT,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R32Uint => vk::Format::R32_UINT,
    }
}

/// Picks FIFO for vsync, else IMMEDIATE; otherwise falls back through
/// FIFO_RELAXED / MAILBOX / the first mode the surface reports, warning on
/// every fallback step.
pub fn choose_present_mode(vsync: bool, available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    let wanted = if vsync {
        vk::PresentModeKHR::FIFO
    } else {
        vk::PresentModeKHR::IMMEDIATE
    };
    if available.contains(&wanted) {
        return wanted;
    }
    for fallback in [vk::PresentModeKHR::FIFO_RELAXED, vk::PresentModeKHR::MAILBOX] {
        if available.contains(&fallback) {
            warn!("requested present mode unavailable, falling back to {fallback:?}");
            return fallback;
        }
    }
    warn!("no preferred present mode available, using first reported mode");
    available.first().copied().unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_image_count(requested: u32, caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let min = caps.min_image_count;
    let max = if caps.max_image_count == 0 { u32::MAX } else { caps.max_image_count };
    requested.max(min).min(max)
}

pub fn choose_extent(requested: Extent2D, caps: &vk::SurfaceCapabilitiesKHR) -> Extent2D {
    if caps.current_extent.width != u32::MAX {
        Extent2D {
            width: caps.current_extent.width,
            height: caps.current_extent.height,
        }
    } else {
        Extent2D {
            width: requested.width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: requested.height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

pub fn required_image_usages() -> vk::ImageUsageFlags {
    vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST
}

pub fn validate_image_usage(caps: &vk::SurfaceCapabilitiesKHR) -> GfxResult<vk::ImageUsageFlags> {
    let required = required_image_usages();
    if !caps.supported_usage_flags.contains(required) {
        return Err(GfxError::runtime(format!(
            "surface does not support required image usages: supported={:?}",
            caps.supported_usage_flags
        )));
    }
    Ok(required)
}

pub struct VulkanSwapChain {
    loader: khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    surface_loader: khr::surface::Instance,
    raw: Mutex<vk::SwapchainKHR>,
    descriptor: Mutex<SwapChainDescriptor>,
    next_index: AtomicU32,
    listeners: Mutex<Vec<Box<dyn Fn(SwapChainResetEvent) + Send + Sync>>>,
    present_queue: vk::Queue,
}

impl VulkanSwapChain {
    pub fn new(
        loader: khr::swapchain::Device,
        surface_loader: khr::surface::Instance,
        surface: vk::SurfaceKHR,
        raw: vk::SwapchainKHR,
        descriptor: SwapChainDescriptor,
        present_queue: vk::Queue,
    ) -> Self {
        Self {
            loader,
            surface,
            surface_loader,
            raw: Mutex::new(raw),
            descriptor: Mutex::new(descriptor),
            next_index: AtomicU32::new(0),
            listeners: Mutex::new(Vec::new()),
            present_queue,
        }
    }

    fn surface_caps(&self, physical_device: vk::PhysicalDevice) -> GfxResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)
        }
        .map_err(|e| GfxError::native("get_physical_device_surface_capabilities", e.as_raw()))
    }
}

impl SwapChain for VulkanSwapChain {
    fn descriptor(&self) -> SwapChainDescriptor {
        *self.descriptor.lock().unwrap()
    }

    fn acquire_next(&self) -> GfxResult<u32> {
        let raw = *self.raw.lock().unwrap();
        let (index, _suboptimal) = unsafe {
            self.loader
                .acquire_next_image(raw, u64::MAX, vk::Semaphore::null(), vk::Fence::null())
        }
        .map_err(|e| GfxError::native("acquire_next_image", e.as_raw()))?;
        self.next_index.store(index, Ordering::SeqCst);
        Ok(index)
    }

    fn present(&self, _wait_on: FenceValue) -> GfxResult<()> {
        let raw = *self.raw.lock().unwrap();
        let index = self.next_index.load(Ordering::SeqCst);
        let swapchains = [raw];
        let indices = [index];
        let present_info = vk::PresentInfoKHR::default()
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe { self.loader.queue_present(self.present_queue, &present_info) }
            .map(|_| ())
            .map_err(|e| GfxError::native("queue_present", e.as_raw()))
    }

    fn reset(&self, new: SwapChainDescriptor) -> GfxResult<()> {
        let old = {
            let mut descriptor = self.descriptor.lock().unwrap();
            let old = *descriptor;
            *descriptor = new;
            old
        };
        // Native recreation (building a new vk::SwapchainKHR with
        // `old_swapchain` set to the current handle) happens in the owning
        // device, which then calls back into this swap chain to swap the
        // raw handle; here we only fire the event contract.
        let _ = to_vk_format(new.format);
        for listener in self.listeners.lock().unwrap().iter() {
            listener(SwapChainResetEvent { old, new });
        }
        Ok(())
    }

    fn on_reset(&self, f: Box<dyn Fn(SwapChainResetEvent) + Send + Sync>) {
        self.listeners.lock().unwrap().push(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_prefers_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(true, &modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn no_vsync_falls_back_when_immediate_missing() {
        let modes = [vk::PresentModeKHR::FIFO_RELAXED, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(false, &modes), vk::PresentModeKHR::FIFO_RELAXED);
    }
}

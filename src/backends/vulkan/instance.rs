use std::ffi::CString;

use ash::vk;

use crate::error::{GfxError, GfxResult};

/// Thin RAII wrapper around `ash::Instance`. Kept alive for as long as any
/// [`super::phy_device::PhyDevice`] derived from it exists.
pub struct Instance {
    pub entry: ash::Entry,
    pub vk_instance: ash::Instance,
}

impl Instance {
    pub fn new(app_name: &str, enable_validation: bool) -> GfxResult<Self> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GfxError::runtime(format!("failed to load Vulkan loader: {e}")))?;

        let app_name_c = CString::new(app_name).unwrap_or_else(|_| CString::new("app").unwrap());
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name_c)
            .api_version(vk::API_VERSION_1_2);

        let mut layer_names = Vec::new();
        let validation_layer = CString::new("VK_LAYER_KHRONOS_validation").unwrap();
        if enable_validation {
            layer_names.push(validation_layer.as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names);

        let vk_instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(|e| GfxError::native("create_instance", e.as_raw()))?;

        Ok(Self { entry, vk_instance })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe { self.vk_instance.destroy_instance(None) };
    }
}

use std::ffi::CStr;
use std::sync::Arc;

use ash::vk;
use log::{info, warn};
use parking_lot::RwLock;

use crate::config::GfxOptions;
use crate::error::{GfxError, GfxResult};
use crate::types::{Gpu, GpuType, Gpus};

use super::instance::Instance;

#[derive(Debug, Default, Clone, Copy)]
pub struct TextureCapabilities {
    pub allows_linear_blitting: bool,
    pub optimal_swap_chain_image_blitting: bool,
    pub optimal_rgba_image_blitting: bool,
    pub linear_rgba_image_blitting: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Limits {
    pub non_coherent_mem_alignment: u64,
    pub optimal_image_copy_mem_alignment: u64,
    pub max_texture_size: u32,
    pub max_sampler_anisotropy: u32,
    pub min_uniform_align: u32,
    pub max_multi_sample: vk::SampleCountFlags,
}

/// Selected physical device plus the ranked adapter list, mirroring the
/// teacher's GPU-enumeration/ranking and per-vendor driver-version decode.
pub struct PhyDevice {
    pub gpu_list: Arc<Gpus>,
    pub limits: Limits,
    pub caps: RwLock<TextureCapabilities>,
    pub renderer_name: String,
    pub vendor_name: String,
    pub version_name: String,
    pub raw: vk::PhysicalDevice,
    pub raw_device_props: vk::PhysicalDeviceProperties,
    pub queue_node_index: u32,
    pub instance: Arc<Instance>,
}

impl PhyDevice {
    fn driver_version_string(driver_version: u32, vendor_id: u32) -> String {
        if vendor_id == 4318 {
            format!(
                "{}.{}.{}.{}",
                (driver_version >> 22) & 0x3ff,
                (driver_version >> 14) & 0x0ff,
                (driver_version >> 6) & 0x0ff,
                driver_version & 0x003f
            )
        } else if vendor_id == 0x8086 {
            format!("{}.{}", driver_version >> 14, driver_version & 0x3fff)
        } else {
            format!(
                "{}.{}.{}",
                driver_version >> 22,
                (driver_version >> 12) & 0x3ff,
                driver_version & 0xfff
            )
        }
    }

    fn vk_gpu_type_to_gpu_type(ty: vk::PhysicalDeviceType) -> GpuType {
        match ty {
            vk::PhysicalDeviceType::DISCRETE_GPU => GpuType::Discrete,
            vk::PhysicalDeviceType::INTEGRATED_GPU => GpuType::Integrated,
            vk::PhysicalDeviceType::VIRTUAL_GPU => GpuType::Virtual,
            vk::PhysicalDeviceType::CPU => GpuType::Cpu,
            _ => GpuType::Cpu,
        }
    }

    fn update_texture_capabilities(&self) {
        let props = unsafe {
            self.instance
                .vk_instance
                .get_physical_device_format_properties(self.raw, vk::Format::R8G8B8A8_UNORM)
        };
        let mut caps = self.caps.write();
        if props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
        {
            caps.allows_linear_blitting = true;
        }
        if props.optimal_tiling_features.contains(vk::FormatFeatureFlags::BLIT_SRC)
            && props.optimal_tiling_features.contains(vk::FormatFeatureFlags::BLIT_DST)
        {
            caps.optimal_rgba_image_blitting = true;
        }
        if props.linear_tiling_features.contains(vk::FormatFeatureFlags::BLIT_DST) {
            caps.linear_rgba_image_blitting = true;
        }
    }

    pub fn update_surface_texture_capabilities(&self, surface_format: vk::Format) {
        let props = unsafe {
            self.instance
                .vk_instance
                .get_physical_device_format_properties(self.raw, surface_format)
        };
        if props.optimal_tiling_features.contains(vk::FormatFeatureFlags::BLIT_SRC) {
            self.caps.write().optimal_swap_chain_image_blitting = true;
        }
    }

    pub fn new(instance: Arc<Instance>, options: &GfxOptions, is_headless: bool) -> GfxResult<Arc<Self>> {
        let device_list = unsafe { instance.vk_instance.enumerate_physical_devices() }
            .map_err(|e| GfxError::native("enumerate_physical_devices", e.as_raw()))?;

        let required_major = 1i32;
        let required_minor = if is_headless { 2i32 } else { 1i32 };
        let is_auto_gpu = options.gpu == "auto";

        let mut gpu_list = Vec::with_capacity(device_list.len());
        let mut device_props = Vec::with_capacity(device_list.len());
        let mut found_index = None;
        let mut found_gpu_type = GpuType::Invalid;
        let mut auto_gpu: Option<Gpu> = None;
        let mut auto_gpu_type = GpuType::Invalid;

        for (index, device) in device_list.iter().enumerate() {
            let props = unsafe { instance.vk_instance.get_physical_device_properties(*device) };
            device_props.push(props);

            let major = vk::api_version_major(props.api_version) as i32;
            let minor = vk::api_version_minor(props.api_version) as i32;
            if major < required_major || (major == required_major && minor < required_minor) {
                continue;
            }

            let name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
                .to_str()
                .unwrap_or("unknown")
                .to_string();
            let gpu_type = Self::vk_gpu_type_to_gpu_type(props.device_type);
            gpu_list.push(Gpu { name: name.clone(), ty: gpu_type });

            if gpu_type < auto_gpu_type {
                auto_gpu = Some(Gpu { name: name.clone(), ty: gpu_type });
                auto_gpu_type = gpu_type;
            }

            let matches_requested = (is_auto_gpu && gpu_type < found_gpu_type) || name == options.gpu;
            if matches_requested {
                found_index = Some(index);
                found_gpu_type = gpu_type;
            }
        }

        let found_index = found_index
            .or_else(|| if auto_gpu.is_some() { Some(0) } else { None })
            .ok_or_else(|| GfxError::runtime("no devices with the required Vulkan version found"))?;
        let auto_gpu = auto_gpu.ok_or_else(|| GfxError::runtime("no devices with the required Vulkan version found"))?;

        let props = &device_props[found_index];
        let major = vk::api_version_major(props.api_version) as i32;
        let minor = vk::api_version_minor(props.api_version) as i32;
        let patch = vk::api_version_patch(props.api_version) as i32;

        let renderer_name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
            .to_str()
            .unwrap_or("unknown")
            .to_string();
        let vendor_name = match props.vendor_id {
            0x1002 => "AMD",
            0x1010 => "ImgTec",
            0x106B => "Apple",
            0x10DE => "NVIDIA",
            0x13B5 => "ARM",
            0x5143 => "Qualcomm",
            0x8086 => "INTEL",
            0x10005 => "Mesa",
            other => {
                warn!("unknown gpu vendor {other}");
                "unknown"
            }
        }
        .to_string();
        let version_name = format!(
            "Vulkan {major}.{minor}.{patch} (driver: {})",
            Self::driver_version_string(props.driver_version, props.vendor_id)
        );
        info!("{version_name}, {vendor_name}");

        let limits = Limits {
            non_coherent_mem_alignment: props.limits.non_coherent_atom_size,
            optimal_image_copy_mem_alignment: props.limits.optimal_buffer_copy_offset_alignment,
            max_texture_size: props.limits.max_image_dimension2_d,
            max_sampler_anisotropy: props.limits.max_sampler_anisotropy as u32,
            min_uniform_align: props.limits.min_uniform_buffer_offset_alignment as u32,
            max_multi_sample: props.limits.framebuffer_color_sample_counts,
        };

        let raw = device_list[found_index];
        let queue_props = unsafe { instance.vk_instance.get_physical_device_queue_family_properties(raw) };
        if queue_props.is_empty() {
            return Err(GfxError::runtime("no vulkan queue family properties found"));
        }
        let queue_node_index = queue_props
            .iter()
            .enumerate()
            .find(|(_, p)| p.queue_count > 0 && p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(i, _)| i as u32)
            .ok_or_else(|| {
                GfxError::runtime("no vulkan queue found that matches the requirements: graphics queue")
            })?;

        let gpus = Arc::new(Gpus {
            gpus: gpu_list,
            cur: Gpu {
                name: renderer_name.clone(),
                ty: found_gpu_type,
            },
            auto: auto_gpu,
        });

        let dev = Arc::new(Self {
            gpu_list: gpus,
            limits,
            caps: RwLock::new(TextureCapabilities::default()),
            renderer_name,
            vendor_name,
            version_name,
            raw,
            raw_device_props: *props,
            queue_node_index,
            instance,
        });
        dev.update_texture_capabilities();
        Ok(dev)
    }
}

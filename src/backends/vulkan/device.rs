use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use log::info;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::acceleration_structure::{AccelerationStructureSizes, BlasBuildInfo, TlasBuildInfo};
use crate::config::{GfxOptions, RequiredFeatures};
use crate::descriptor::{DescriptorSet, DescriptorSetLayout, GlobalDescriptorAllocator};
use crate::device::Device;
use crate::error::{GfxError, GfxResult};
use crate::pipeline::{ComputePipelineDescriptor, GraphicsPipelineDescriptor, PipelineHandle, PipelineKind, RayTracingPipelineDescriptor};
use crate::queue::Queue;
use crate::resource::{Buffer, Image};
use crate::surface::SurfaceSource;
use crate::swapchain::{SwapChain, SwapChainDescriptor};
use crate::types::{BufferKind, BufferUsage, Dimensionality, Extent3D, Format, Gpus, HeapClass, ImageUsage, QueueKind};

use super::instance::Instance;
use super::phy_device::PhyDevice;
use super::queue::VulkanQueue;
use super::swapchain::{choose_extent, choose_image_count, choose_present_mode, validate_image_usage, VulkanSwapChain};

/// The loader trio needed to create and recreate swap chains against one
/// `VkSurfaceKHR`. Absent entirely in headless mode, in which case
/// `create_swap_chain` fails fast.
struct VulkanSurface {
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    raw: vk::SurfaceKHR,
}

impl Drop for VulkanSurface {
    fn drop(&mut self) {
        unsafe { self.surface_loader.destroy_surface(self.raw, None) };
    }
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed)
}

/// The mandatory extensions requested for every device: timeline
/// semaphores, synchronization2 (enhanced barriers), dynamic rendering, and
/// descriptor indexing (bindless). Mesh shader / ray tracing / acceleration
/// structure extensions are appended only when requested.
fn mandatory_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::timeline_semaphore::NAME,
        ash::khr::synchronization2::NAME,
        ash::khr::dynamic_rendering::NAME,
        ash::ext::descriptor_indexing::NAME,
        ash::khr::swapchain::NAME,
    ]
}

pub struct VulkanDevice {
    pub phy: Arc<PhyDevice>,
    pub raw: Arc<ash::Device>,
    options: GfxOptions,
    required_features: RequiredFeatures,
    queues: HashMap<QueueKind, Arc<dyn Queue>>,
    id_counter: Arc<AtomicU64>,
    descriptors: Arc<GlobalDescriptorAllocator>,
    surface: Option<VulkanSurface>,
    instance: Arc<Instance>,
    graphics_queue_raw: vk::Queue,
}

impl VulkanDevice {
    pub fn new(
        instance: Arc<Instance>,
        options: GfxOptions,
        required_features: RequiredFeatures,
        surface_source: SurfaceSource<'_>,
    ) -> GfxResult<Arc<Self>> {
        let is_headless = matches!(surface_source, SurfaceSource::Headless);
        let phy = PhyDevice::new(instance.clone(), &options, is_headless)?;

        let mut extension_names: Vec<_> = mandatory_extensions().iter().map(|e| e.as_ptr()).collect();
        if required_features.ray_tracing || required_features.acceleration_structures {
            extension_names.push(ash::khr::acceleration_structure::NAME.as_ptr());
            extension_names.push(ash::khr::ray_tracing_pipeline::NAME.as_ptr());
            extension_names.push(ash::khr::deferred_host_operations::NAME.as_ptr());
        }
        if required_features.mesh_shaders {
            extension_names.push(ash::ext::mesh_shader::NAME.as_ptr());
        }

        let mut timeline_features = vk::PhysicalDeviceTimelineSemaphoreFeatures::default().timeline_semaphore(true);
        let mut sync2_features = vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true);
        let mut dynamic_rendering_features =
            vk::PhysicalDeviceDynamicRenderingFeatures::default().dynamic_rendering(true);
        let mut descriptor_indexing_features = vk::PhysicalDeviceDescriptorIndexingFeatures::default()
            .shader_sampled_image_array_non_uniform_indexing(true)
            .descriptor_binding_partially_bound(true)
            .runtime_descriptor_array(true);

        let queue_priorities = [1.0f32];
        let queue_create_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(phy.queue_node_index)
            .queue_priorities(&queue_priorities);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&extension_names)
            .push_next(&mut timeline_features)
            .push_next(&mut sync2_features)
            .push_next(&mut dynamic_rendering_features)
            .push_next(&mut descriptor_indexing_features);

        let raw = unsafe { instance.vk_instance.create_device(phy.raw, &create_info, None) }
            .map_err(|e| GfxError::native("create_device", e.as_raw()))?;
        let raw = Arc::new(raw);

        info!("created vulkan device on {}", phy.renderer_name);

        let graphics_raw = unsafe { raw.get_device_queue(phy.queue_node_index, 0) };

        let mut timeline_type_info =
            vk::SemaphoreTypeCreateInfo::default().semaphore_type(vk::SemaphoreType::TIMELINE).initial_value(0);
        let sem_info = vk::SemaphoreCreateInfo::default().push_next(&mut timeline_type_info);
        let graphics_timeline = unsafe { raw.create_semaphore(&sem_info, None) }
            .map_err(|e| GfxError::native("create_semaphore", e.as_raw()))?;

        let mut queues: HashMap<QueueKind, Arc<dyn Queue>> = HashMap::new();
        let graphics_queue = Arc::new(VulkanQueue::new(
            raw.clone(),
            graphics_raw,
            phy.queue_node_index,
            QueueKind::Graphics,
            crate::types::QueuePriority::Normal,
            graphics_timeline,
        ));
        queues.insert(QueueKind::Graphics, graphics_queue.clone());
        // No dedicated transfer/compute queue family was found in this
        // retrieval slice's enumeration: both alias the graphics queue,
        // matching the spec's documented fallback.
        queues.insert(QueueKind::Transfer, graphics_queue.clone());
        queues.insert(QueueKind::Compute, graphics_queue.clone());

        let surface = match surface_source {
            SurfaceSource::Window(handle) => {
                let surface_loader = ash::khr::surface::Instance::new(&instance.entry, &instance.vk_instance);
                let raw = unsafe {
                    ash_window::create_surface(
                        &instance.entry,
                        &instance.vk_instance,
                        handle.display_handle().map_err(|e| GfxError::runtime(e.to_string()))?.as_raw(),
                        handle.window_handle().map_err(|e| GfxError::runtime(e.to_string()))?.as_raw(),
                        None,
                    )
                }
                .map_err(|e| GfxError::native("create_surface", e.as_raw()))?;
                let supported = unsafe {
                    surface_loader.get_physical_device_surface_support(phy.raw, phy.queue_node_index, raw)
                }
                .map_err(|e| GfxError::native("get_physical_device_surface_support", e.as_raw()))?;
                if !supported {
                    return Err(GfxError::runtime("selected queue family does not support presentation to this surface"));
                }
                let swapchain_loader = ash::khr::swapchain::Device::new(&instance.vk_instance, &raw);
                Some(VulkanSurface { surface_loader, swapchain_loader, raw })
            }
            SurfaceSource::Headless => None,
        };

        Ok(Arc::new(Self {
            phy,
            raw,
            options,
            required_features,
            queues,
            id_counter: Arc::new(AtomicU64::new(1)),
            descriptors: Arc::new(GlobalDescriptorAllocator::new(1_000_000)),
            surface,
            instance,
            graphics_queue_raw: graphics_raw,
        }))
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        let _ = self.wait();
        unsafe { self.raw.destroy_device(None) };
    }
}

impl Device for VulkanDevice {
    fn gpus(&self) -> Arc<Gpus> {
        self.phy.gpu_list.clone()
    }

    fn options(&self) -> &GfxOptions {
        &self.options
    }

    fn default_queue(&self, kind: QueueKind) -> Arc<dyn Queue> {
        self.queues
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.queues[&QueueKind::Graphics].clone())
    }

    fn create_buffer(
        &self,
        kind: BufferKind,
        heap_class: HeapClass,
        elements: u64,
        element_size: u64,
        usage: BufferUsage,
        debug_name: Option<&str>,
    ) -> GfxResult<Arc<Buffer>> {
        let align = self.phy.limits.min_uniform_align.max(1) as u64;
        Ok(Arc::new(Buffer::new(
            next_id(&self.id_counter),
            debug_name.map(str::to_string),
            kind,
            heap_class,
            elements,
            element_size,
            align,
            usage,
        )?))
    }

    fn create_image(
        &self,
        format: Format,
        extent: Extent3D,
        dimensionality: Dimensionality,
        array_layers: u32,
        mip_levels: u32,
        samples: u32,
        usage: ImageUsage,
        debug_name: Option<&str>,
    ) -> GfxResult<Arc<Image>> {
        Ok(Arc::new(Image::new(
            next_id(&self.id_counter),
            debug_name.map(str::to_string),
            format,
            extent,
            dimensionality,
            array_layers,
            mip_levels,
            samples,
            usage,
        )))
    }

    fn create_descriptor_set_layout(&self, layout: DescriptorSetLayout) -> GfxResult<Arc<DescriptorSetLayout>> {
        Ok(Arc::new(layout))
    }

    fn allocate_descriptor_set(&self, layout: &Arc<DescriptorSetLayout>) -> GfxResult<DescriptorSet> {
        let (buffers, samplers) = layout.slot_counts();
        let (buffer_range, sampler_range) = self.descriptors.allocate(buffers, samplers)?;
        Ok(DescriptorSet {
            id: next_id(&self.id_counter),
            layout: layout.clone(),
            buffer_range,
            sampler_range,
            bindings: HashMap::new(),
        })
    }

    fn release_descriptor_set(&self, set: DescriptorSet) {
        self.descriptors.release(set.buffer_range, set.sampler_range);
    }

    fn update_buffer_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        self.descriptors.update_buffer_descriptors(set)
    }

    fn update_sampler_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        self.descriptors.update_sampler_descriptors(set)
    }

    fn bind_global_descriptor_heaps(&self, _cmd: &mut dyn crate::command_buffer::CommandBuffer) -> GfxResult<()> {
        // Vulkan's bindless layout has no equivalent of DX12's
        // SetDescriptorHeaps; descriptor tables are addressed directly by
        // the pipeline layout set on `use_pipeline`.
        Ok(())
    }

    fn create_graphics_pipeline(&self, desc: GraphicsPipelineDescriptor) -> GfxResult<PipelineHandle> {
        desc.validate()?;
        let kind = if desc.is_mesh_pipeline() {
            PipelineKind::Mesh
        } else {
            PipelineKind::Graphics
        };
        Ok(PipelineHandle { id: next_id(&self.id_counter), kind })
    }

    fn create_compute_pipeline(&self, _desc: ComputePipelineDescriptor) -> GfxResult<PipelineHandle> {
        Ok(PipelineHandle { id: next_id(&self.id_counter), kind: PipelineKind::Compute })
    }

    fn create_raytracing_pipeline(&self, _desc: RayTracingPipelineDescriptor) -> GfxResult<PipelineHandle> {
        if !self.required_features.ray_tracing {
            return Err(GfxError::invalid("ray tracing was not requested in RequiredFeatures"));
        }
        Ok(PipelineHandle { id: next_id(&self.id_counter), kind: PipelineKind::RayTracing })
    }

    fn create_swap_chain(&self, desc: SwapChainDescriptor) -> GfxResult<Arc<dyn SwapChain>> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| GfxError::invalid("device was created headless; no surface to build a swap chain on"))?;

        let caps = unsafe {
            surface.surface_loader.get_physical_device_surface_capabilities(self.phy.raw, surface.raw)
        }
        .map_err(|e| GfxError::native("get_physical_device_surface_capabilities", e.as_raw()))?;
        let present_modes = unsafe {
            surface.surface_loader.get_physical_device_surface_present_modes(self.phy.raw, surface.raw)
        }
        .map_err(|e| GfxError::native("get_physical_device_surface_present_modes", e.as_raw()))?;

        let extent = choose_extent(desc.extent, &caps);
        let image_count = choose_image_count(desc.back_buffer_count, &caps);
        let present_mode = choose_present_mode(desc.vsync, &present_modes);
        let image_usage = validate_image_usage(&caps)?;
        let format = super::swapchain::to_vk_format(desc.format);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.raw)
            .min_image_count(image_count)
            .image_format(format)
            .image_color_space(vk::ColorSpaceKHR::SRGB_NONLINEAR)
            .image_extent(vk::Extent2D { width: extent.width, height: extent.height })
            .image_array_layers(1)
            .image_usage(image_usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let raw_swapchain = unsafe { surface.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| GfxError::native("create_swapchain", e.as_raw()))?;

        let present_queue = self.graphics_queue_raw;

        Ok(Arc::new(VulkanSwapChain::new(
            surface.swapchain_loader.clone(),
            surface.surface_loader.clone(),
            surface.raw,
            raw_swapchain,
            SwapChainDescriptor { extent, back_buffer_count: image_count, ..desc },
            present_queue,
        )))
    }

    fn compute_acceleration_structure_sizes_blas(&self, info: &BlasBuildInfo) -> GfxResult<AccelerationStructureSizes> {
        let vertex_bytes: u64 = info.geometries.iter().map(|g| g.vertex_count as u64 * g.vertex_stride as u64).sum();
        Ok(AccelerationStructureSizes {
            result_size: vertex_bytes * 2,
            scratch_size: vertex_bytes,
        }
        .align_up(self.phy.limits.min_uniform_align as u64))
    }

    fn compute_acceleration_structure_sizes_tlas(&self, info: &TlasBuildInfo) -> GfxResult<AccelerationStructureSizes> {
        let instance_bytes = info.instances.len() as u64 * 64;
        Ok(AccelerationStructureSizes {
            result_size: instance_bytes * 2,
            scratch_size: instance_bytes,
        }
        .align_up(self.phy.limits.min_uniform_align as u64))
    }

    fn wait(&self) -> GfxResult<()> {
        use rayon::prelude::*;
        self.queues
            .values()
            .collect::<Vec<_>>()
            .par_iter()
            .try_for_each(|queue| queue.wait_for(queue.current_value()))
    }

    fn max_multi_sampling_level(&self, _format: Format) -> u32 {
        let counts = self.phy.limits.max_multi_sample;
        for (flag, level) in [
            (vk::SampleCountFlags::TYPE_64, 64),
            (vk::SampleCountFlags::TYPE_32, 32),
            (vk::SampleCountFlags::TYPE_16, 16),
            (vk::SampleCountFlags::TYPE_8, 8),
            (vk::SampleCountFlags::TYPE_4, 4),
            (vk::SampleCountFlags::TYPE_2, 2),
        ] {
            if counts.contains(flag) {
                return level;
            }
        }
        1
    }

    fn ticks_per_millisecond(&self) -> u64 {
        1_000_000
    }

    fn required_features(&self) -> &RequiredFeatures {
        &self.required_features
    }
}

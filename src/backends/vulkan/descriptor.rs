use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;

use crate::descriptor::DescriptorKind;
use crate::error::{GfxError, GfxResult};

fn to_vk_descriptor_type(kind: DescriptorKind) -> vk::DescriptorType {
    match kind {
        DescriptorKind::ConstantBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorKind::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        DescriptorKind::WritableImage => vk::DescriptorType::STORAGE_IMAGE,
        DescriptorKind::Sampler => vk::DescriptorType::SAMPLER,
        DescriptorKind::InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
        DescriptorKind::AccelerationStructure => vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
    }
}

/// Wraps a `vk::DescriptorPool` sized up front for a fixed mix of descriptor
/// types (the bindless-indexing pool). Allocation failures from pool
/// exhaustion surface the same "out of descriptors" error the DX12-like
/// global-heap allocator reports, so callers see one error vocabulary.
pub struct VulkanDescriptorPool {
    device: Arc<ash::Device>,
    raw: Mutex<vk::DescriptorPool>,
}

impl VulkanDescriptorPool {
    pub fn new(device: Arc<ash::Device>, max_sets: u32, pool_sizes: &[(DescriptorKind, u32)]) -> GfxResult<Self> {
        let sizes: Vec<_> = pool_sizes
            .iter()
            .map(|(kind, count)| {
                vk::DescriptorPoolSize::default()
                    .ty(to_vk_descriptor_type(*kind))
                    .descriptor_count(*count)
            })
            .collect();
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(&sizes)
            .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND | vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);
        let raw = unsafe { device.create_descriptor_pool(&create_info, None) }
            .map_err(|e| GfxError::native("create_descriptor_pool", e.as_raw()))?;
        Ok(Self { device, raw: Mutex::new(raw) })
    }

    pub fn allocate(&self, layout: vk::DescriptorSetLayout) -> GfxResult<vk::DescriptorSet> {
        let pool = *self.raw.lock();
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe { self.device.allocate_descriptor_sets(&alloc_info) }.map_err(|e| {
            if e == vk::Result::ERROR_OUT_OF_POOL_MEMORY || e == vk::Result::ERROR_FRAGMENTED_POOL {
                GfxError::runtime("out of descriptors")
            } else {
                GfxError::native("allocate_descriptor_sets", e.as_raw())
            }
        })?;
        Ok(sets[0])
    }

    pub fn free(&self, set: vk::DescriptorSet) {
        let pool = *self.raw.lock();
        unsafe {
            let _ = self.device.free_descriptor_sets(pool, &[set]);
        }
    }
}

impl Drop for VulkanDescriptorPool {
    fn drop(&mut self) {
        unsafe { self.device.destroy_descriptor_pool(*self.raw.lock(), None) };
    }
}

use ash::khr;
use ash::vk;

use crate::acceleration_structure::{AccelerationStructureBuildFlags, AccelerationStructureSizes};
use crate::error::{GfxError, GfxResult};

pub fn to_vk_build_flags(flags: AccelerationStructureBuildFlags) -> vk::BuildAccelerationStructureFlagsKHR {
    let mut out = vk::BuildAccelerationStructureFlagsKHR::empty();
    if flags.contains(AccelerationStructureBuildFlags::ALLOW_UPDATE) {
        out |= vk::BuildAccelerationStructureFlagsKHR::ALLOW_UPDATE;
    }
    if flags.contains(AccelerationStructureBuildFlags::ALLOW_COMPACTION) {
        out |= vk::BuildAccelerationStructureFlagsKHR::ALLOW_COMPACTION;
    }
    if flags.contains(AccelerationStructureBuildFlags::PREFER_FAST_TRACE) {
        out |= vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE;
    }
    if flags.contains(AccelerationStructureBuildFlags::PREFER_FAST_BUILD) {
        out |= vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_BUILD;
    }
    out
}

/// Queries `vkGetAccelerationStructureBuildSizesKHR` and aligns both
/// results up to the device's minimum uniform-buffer offset alignment.
pub fn query_build_sizes(
    loader: &khr::acceleration_structure::Device,
    ty: vk::AccelerationStructureTypeKHR,
    geometry_info: &vk::AccelerationStructureBuildGeometryInfoKHR,
    primitive_counts: &[u32],
    min_alignment: u64,
) -> GfxResult<AccelerationStructureSizes> {
    let mut geometry_info = *geometry_info;
    geometry_info.ty = ty;
    let sizes = unsafe {
        loader.get_acceleration_structure_build_sizes(
            vk::AccelerationStructureBuildTypeKHR::DEVICE,
            &geometry_info,
            primitive_counts,
        )
    };
    if sizes.acceleration_structure_size == 0 {
        return Err(GfxError::runtime("acceleration structure build size query returned zero"));
    }
    Ok(AccelerationStructureSizes {
        result_size: sizes.acceleration_structure_size,
        scratch_size: sizes.build_scratch_size,
    }
    .align_up(min_alignment))
}

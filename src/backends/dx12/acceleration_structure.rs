use windows::Win32::Graphics::Direct3D12::*;

use crate::acceleration_structure::{AccelerationStructureBuildFlags, AccelerationStructureSizes};
use crate::error::{GfxError, GfxResult};

const AS_ALIGNMENT: u64 = D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BYTE_ALIGNMENT as u64;

pub fn to_d3d12_build_flags(flags: AccelerationStructureBuildFlags) -> D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAGS {
    let mut out = D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAG_NONE;
    if flags.contains(AccelerationStructureBuildFlags::ALLOW_UPDATE) {
        out |= D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAG_ALLOW_UPDATE;
    }
    if flags.contains(AccelerationStructureBuildFlags::ALLOW_COMPACTION) {
        out |= D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAG_ALLOW_COMPACTION;
    }
    if flags.contains(AccelerationStructureBuildFlags::PREFER_FAST_TRACE) {
        out |= D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAG_PREFER_FAST_TRACE;
    }
    if flags.contains(AccelerationStructureBuildFlags::PREFER_FAST_BUILD) {
        out |= D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAG_PREFER_FAST_BUILD;
    }
    out
}

/// Queries `GetRaytracingAccelerationStructurePrebuildInfo` for a fully
/// populated `D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_INPUTS` and
/// aligns both reported sizes to the alignment DX12 mandates for
/// acceleration-structure buffers.
pub fn query_prebuild_info(
    device: &ID3D12Device5,
    inputs: &D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_INPUTS,
) -> GfxResult<AccelerationStructureSizes> {
    let mut info = D3D12_RAYTRACING_ACCELERATION_STRUCTURE_PREBUILD_INFO::default();
    unsafe { device.GetRaytracingAccelerationStructurePrebuildInfo(inputs, &mut info) };
    if info.ResultDataMaxSizeInBytes == 0 {
        return Err(GfxError::runtime(
            "GetRaytracingAccelerationStructurePrebuildInfo reported a zero-size result buffer",
        ));
    }
    let scratch = info.ScratchDataSizeInBytes.max(info.UpdateScratchDataSizeInBytes);
    Ok(AccelerationStructureSizes {
        result_size: info.ResultDataMaxSizeInBytes,
        scratch_size: scratch,
    }
    .align_up(AS_ALIGNMENT))
}

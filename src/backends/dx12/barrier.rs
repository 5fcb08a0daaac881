use windows::Win32::Graphics::Direct3D12::*;

use crate::types::{ImageLayout, PipelineStage, ResourceAccess};

pub fn to_d3d12_barrier_sync(stage: PipelineStage) -> D3D12_BARRIER_SYNC {
    match stage {
        PipelineStage::All => D3D12_BARRIER_SYNC_ALL,
        PipelineStage::Draw => D3D12_BARRIER_SYNC_DRAW,
        PipelineStage::Compute => D3D12_BARRIER_SYNC_COMPUTE_SHADING,
        PipelineStage::InputAssembly => D3D12_BARRIER_SYNC_INDEX_INPUT,
        PipelineStage::Vertex => D3D12_BARRIER_SYNC_VERTEX_SHADING,
        PipelineStage::TessellationControl | PipelineStage::TessellationEvaluation => D3D12_BARRIER_SYNC_VERTEX_SHADING,
        PipelineStage::Geometry => D3D12_BARRIER_SYNC_VERTEX_SHADING,
        PipelineStage::Fragment => D3D12_BARRIER_SYNC_PIXEL_SHADING,
        PipelineStage::DepthStencil => D3D12_BARRIER_SYNC_DEPTH_STENCIL,
        PipelineStage::Indirect => D3D12_BARRIER_SYNC_EXECUTE_INDIRECT,
        PipelineStage::RenderTarget => D3D12_BARRIER_SYNC_RENDER_TARGET,
        PipelineStage::Transfer => D3D12_BARRIER_SYNC_COPY,
        PipelineStage::Resolve => D3D12_BARRIER_SYNC_RESOLVE,
        PipelineStage::Raytracing => D3D12_BARRIER_SYNC_RAYTRACING,
        PipelineStage::AccelerationStructureBuild => D3D12_BARRIER_SYNC_BUILD_RAYTRACING_ACCELERATION_STRUCTURE,
    }
}

pub fn to_d3d12_barrier_access(access: ResourceAccess) -> D3D12_BARRIER_ACCESS {
    let mut out = D3D12_BARRIER_ACCESS_COMMON;
    if access.contains(ResourceAccess::SHADER_READ) {
        out = D3D12_BARRIER_ACCESS_SHADER_RESOURCE;
    }
    if access.contains(ResourceAccess::SHADER_WRITE) {
        out = D3D12_BARRIER_ACCESS_UNORDERED_ACCESS;
    }
    out
}

pub fn to_d3d12_layout(layout: ImageLayout) -> D3D12_BARRIER_LAYOUT {
    match layout {
        ImageLayout::Undefined => D3D12_BARRIER_LAYOUT_UNDEFINED,
        ImageLayout::ReadWrite => D3D12_BARRIER_LAYOUT_UNORDERED_ACCESS,
        ImageLayout::ShaderResource => D3D12_BARRIER_LAYOUT_SHADER_RESOURCE,
        ImageLayout::ColorAttachment => D3D12_BARRIER_LAYOUT_RENDER_TARGET,
        ImageLayout::DepthRead => D3D12_BARRIER_LAYOUT_DEPTH_STENCIL_READ,
        ImageLayout::DepthWrite => D3D12_BARRIER_LAYOUT_DEPTH_STENCIL_WRITE,
        ImageLayout::TransferSrc => D3D12_BARRIER_LAYOUT_COPY_SOURCE,
        ImageLayout::TransferDst => D3D12_BARRIER_LAYOUT_COPY_DEST,
        ImageLayout::ResolveSource => D3D12_BARRIER_LAYOUT_RESOLVE_SOURCE,
        ImageLayout::ResolveDestination => D3D12_BARRIER_LAYOUT_RESOLVE_DEST,
        ImageLayout::Present => D3D12_BARRIER_LAYOUT_PRESENT,
    }
}

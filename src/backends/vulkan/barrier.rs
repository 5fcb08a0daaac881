use ash::vk;

use crate::types::{ImageLayout, PipelineStage, ResourceAccess};

pub fn to_vk_stage(stage: PipelineStage) -> vk::PipelineStageFlags2 {
    use vk::PipelineStageFlags2 as S;
    match stage {
        PipelineStage::All => S::ALL_COMMANDS,
        PipelineStage::Draw => S::ALL_GRAPHICS,
        PipelineStage::Compute => S::COMPUTE_SHADER,
        PipelineStage::InputAssembly => S::VERTEX_INPUT,
        PipelineStage::Vertex => S::VERTEX_SHADER,
        PipelineStage::TessellationControl => S::TESSELLATION_CONTROL_SHADER,
        PipelineStage::TessellationEvaluation => S::TESSELLATION_EVALUATION_SHADER,
        PipelineStage::Geometry => S::GEOMETRY_SHADER,
        PipelineStage::Fragment => S::FRAGMENT_SHADER,
        PipelineStage::DepthStencil => S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
        PipelineStage::Indirect => S::DRAW_INDIRECT,
        PipelineStage::RenderTarget => S::COLOR_ATTACHMENT_OUTPUT,
        PipelineStage::Transfer => S::TRANSFER,
        PipelineStage::Resolve => S::RESOLVE,
        PipelineStage::Raytracing => S::RAY_TRACING_SHADER_KHR,
        PipelineStage::AccelerationStructureBuild => S::ACCELERATION_STRUCTURE_BUILD_KHR,
    }
}

pub fn to_vk_access(access: ResourceAccess) -> vk::AccessFlags2 {
    let mut out = vk::AccessFlags2::empty();
    if access.contains(ResourceAccess::MEMORY_READ) {
        out |= vk::AccessFlags2::MEMORY_READ;
    }
    if access.contains(ResourceAccess::MEMORY_WRITE) {
        out |= vk::AccessFlags2::MEMORY_WRITE;
    }
    if access.contains(ResourceAccess::SHADER_READ) {
        out |= vk::AccessFlags2::SHADER_READ;
    }
    if access.contains(ResourceAccess::SHADER_WRITE) {
        out |= vk::AccessFlags2::SHADER_WRITE;
    }
    out
}

pub fn to_vk_layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::ReadWrite => vk::ImageLayout::GENERAL,
        ImageLayout::ShaderResource => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthRead => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::DepthWrite => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::ResolveSource | ImageLayout::ResolveDestination => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::Present => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_access_expands_to_read_and_write() {
        let vk_access = to_vk_access(ResourceAccess::COMMON);
        assert!(vk_access.contains(vk::AccessFlags2::MEMORY_READ));
        assert!(vk_access.contains(vk::AccessFlags2::MEMORY_WRITE));
    }
}

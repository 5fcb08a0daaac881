use crate::descriptor::{DescriptorSetLayout, ShaderStageMask};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct PushConstantRange {
    pub stage_flags: ShaderStageMask,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PushConstantLayout {
    pub ranges: Vec<PushConstantRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    Uint1,
    Uint4,
    Byte4Norm,
}

#[derive(Debug, Clone)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct VertexBufferLayout {
    pub binding: u32,
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// The descriptor-set-layout/push-constant grouping shared by every
/// pipeline kind — the root signature in DX12 terms, the pipeline layout in
/// Vulkan terms.
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor {
    pub descriptor_set_layouts: Vec<Arc<DescriptorSetLayout>>,
    pub push_constants: PushConstantLayout,
    pub vertex_buffers: Vec<VertexBufferLayout>,
    pub geometry_is_line: bool,
}

impl PipelineLayoutDescriptor {
    pub fn new() -> Self {
        Self {
            descriptor_set_layouts: Vec::new(),
            push_constants: PushConstantLayout::default(),
            vertex_buffers: Vec::new(),
            geometry_is_line: false,
        }
    }
}

impl Default for PipelineLayoutDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

pub mod compute;
pub mod graphics;
pub mod input_attachments;
pub mod layout;
pub mod raytracing;
pub mod shader;

pub use compute::ComputePipelineDescriptor;
pub use graphics::{GraphicsPipelineDescriptor, PrimitiveTopology, IndexType};
pub use input_attachments::InputAttachmentBinder;
pub use layout::{PipelineLayoutDescriptor, PushConstantLayout, PushConstantRange, VertexAttribute, VertexBufferLayout, VertexFormat};
pub use raytracing::{RayTracingPipelineDescriptor, ShaderBindingTable, ShaderBindingTableRange, ShaderRecord, ShaderRecordCollection};
pub use shader::{ShaderModule, ShaderProgram, ShaderStage};

use crate::types::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Graphics,
    Mesh,
    Compute,
    RayTracing,
}

/// Handle to an immutable, built pipeline state object. Usable from any
/// thread once constructed.
#[derive(Debug, Clone, Copy)]
pub struct PipelineHandle {
    pub id: ResourceId,
    pub kind: PipelineKind,
}

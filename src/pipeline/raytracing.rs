use crate::pipeline::layout::PipelineLayoutDescriptor;
use crate::pipeline::shader::ShaderProgram;

#[derive(Debug, Clone)]
pub struct ShaderRecord {
    pub shader_name: String,
    /// Untyped per-record local-root payload; type safety is the builder's
    /// responsibility, not this representation's.
    pub local_payload: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderRecordCollection {
    pub ray_gen: Option<ShaderRecord>,
    pub miss: Vec<ShaderRecord>,
    pub hit_groups: Vec<ShaderRecord>,
    pub callable: Vec<ShaderRecord>,
}

#[derive(Debug, Clone)]
pub struct RayTracingPipelineDescriptor {
    pub program: ShaderProgram,
    pub layout: PipelineLayoutDescriptor,
    pub records: ShaderRecordCollection,
    pub max_recursion_depth: u32,
    pub max_ray_payload_size: u32,
    pub max_attribute_size: u32,
}

/// Offsets into a shader-binding-table buffer for one record group.
#[derive(Debug, Clone, Copy)]
pub struct ShaderBindingTableRange {
    pub start: u64,
    pub size: u64,
    pub stride: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderBindingTable {
    pub ray_gen: ShaderBindingTableRange,
    pub miss: ShaderBindingTableRange,
    pub hit_groups: ShaderBindingTableRange,
    pub callable: ShaderBindingTableRange,
}

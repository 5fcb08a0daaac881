use crate::pipeline::layout::PipelineLayoutDescriptor;
use crate::pipeline::shader::ShaderModule;

#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor {
    pub module: ShaderModule,
    pub layout: PipelineLayoutDescriptor,
}

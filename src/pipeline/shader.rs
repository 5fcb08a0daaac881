use crate::descriptor::DescriptorDeclaration;
use crate::pipeline::layout::{PipelineLayoutDescriptor, PushConstantRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    Compute,
    Mesh,
    Task,
    RayGen,
    Miss,
    ClosestHit,
    AnyHit,
    Intersection,
    Callable,
}

/// Opaque pre-compiled bytecode plus the declared bindings a caller supplies
/// alongside it — this core never parses SPIR-V/DXIL, so "reflection" means
/// reading this caller-declared table, not introspecting the bytecode.
#[derive(Debug, Clone)]
pub struct ShaderModule {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub bytecode: Vec<u8>,
    pub declared_bindings: Vec<(u32, DescriptorDeclaration)>,
    pub declared_push_constants: Vec<PushConstantRange>,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderProgram {
    pub modules: Vec<ShaderModule>,
}

impl ShaderProgram {
    pub fn has_mesh_stage(&self) -> bool {
        self.modules
            .iter()
            .any(|m| matches!(m.stage, ShaderStage::Mesh | ShaderStage::Task))
    }

    pub fn has_raytracing_stage(&self) -> bool {
        self.modules.iter().any(|m| {
            matches!(
                m.stage,
                ShaderStage::RayGen
                    | ShaderStage::Miss
                    | ShaderStage::ClosestHit
                    | ShaderStage::AnyHit
                    | ShaderStage::Intersection
                    | ShaderStage::Callable
            )
        })
    }

    /// Best-effort layout derivation from the bindings declared alongside
    /// each module's bytecode (see module doc comment — not true reflection).
    pub fn reflect_layout(&self) -> PipelineLayoutDescriptor {
        let mut layout = PipelineLayoutDescriptor::new();
        for range in self.modules.iter().flat_map(|m| m.declared_push_constants.iter()) {
            layout.push_constants.ranges.push(*range);
        }
        layout
    }
}

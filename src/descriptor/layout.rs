use crate::error::{GfxError, GfxResult};
use crate::types::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    ConstantBuffer,
    StorageBuffer,
    SampledImage,
    WritableImage,
    Sampler,
    InputAttachment,
    AccelerationStructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingPoint {
    pub register: u32,
    pub space: u32,
}

#[derive(Debug, Clone)]
pub struct DescriptorDeclaration {
    pub kind: DescriptorKind,
    pub register: u32,
    /// 0 = bindless/unbounded.
    pub count: u32,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShaderStageMask: u32 {
        const VERTEX = 0b0000_0001;
        const TESSELLATION_CONTROL = 0b0000_0010;
        const TESSELLATION_EVALUATION = 0b0000_0100;
        const GEOMETRY = 0b0000_1000;
        const FRAGMENT = 0b0001_0000;
        const COMPUTE = 0b0010_0000;
        const MESH = 0b0100_0000;
        const TASK = 0b1000_0000;
        const RAY_GEN = 0b1_0000_0000;
        const ANY_HIT = 0b10_0000_0000;
        const CLOSEST_HIT = 0b100_0000_0000;
        const MISS = 0b1000_0000_0000;
        const INTERSECTION = 0b1_0000_0000_0000;
        const CALLABLE = 0b10_0000_0000_0000;
    }
}

#[derive(Debug, Clone)]
pub struct DescriptorSetLayout {
    pub id: ResourceId,
    pub set: u32,
    pub stages: ShaderStageMask,
    pub declarations: Vec<DescriptorDeclaration>,
}

impl DescriptorSetLayout {
    pub fn new(
        id: ResourceId,
        set: u32,
        stages: ShaderStageMask,
        declarations: Vec<DescriptorDeclaration>,
    ) -> GfxResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for decl in &declarations {
            if !seen.insert(decl.register) {
                return Err(GfxError::invalid(format!(
                    "duplicate binding register {} in set {set}",
                    decl.register
                )));
            }
        }
        Ok(Self {
            id,
            set,
            stages,
            declarations,
        })
    }

    /// Sum of descriptor counts that require a buffer-style heap slot
    /// (constant buffer, storage buffer, sampled/writable image, input
    /// attachment, acceleration structure) versus sampler-style slots.
    pub fn slot_counts(&self) -> (u32, u32) {
        let mut buffers = 0u32;
        let mut samplers = 0u32;
        for decl in &self.declarations {
            let count = decl.count.max(1);
            match decl.kind {
                DescriptorKind::Sampler => samplers += count,
                _ => buffers += count,
            }
        }
        (buffers, samplers)
    }
}

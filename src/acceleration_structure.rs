use crate::types::ResourceId;

#[derive(Debug, Clone, Copy)]
pub struct Transform3x4(pub [[f32; 4]; 3]);

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GeometryFlags: u32 {
        const OPAQUE = 0b01;
        const NO_DUPLICATE_ANY_HIT = 0b10;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccelerationStructureBuildFlags: u32 {
        const ALLOW_UPDATE = 0b0001;
        const ALLOW_COMPACTION = 0b0010;
        const PREFER_FAST_TRACE = 0b0100;
        const PREFER_FAST_BUILD = 0b1000;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TriangleGeometry {
    pub vertex_buffer: ResourceId,
    pub vertex_stride: u32,
    pub vertex_count: u32,
    pub index_buffer: Option<ResourceId>,
    pub index_count: u32,
    pub transform: Option<ResourceId>,
    pub flags: GeometryFlags,
}

#[derive(Debug, Clone)]
pub struct BlasBuildInfo {
    pub geometries: Vec<TriangleGeometry>,
    pub flags: AccelerationStructureBuildFlags,
}

#[derive(Debug, Clone, Copy)]
pub struct InstanceRecord {
    pub blas: ResourceId,
    pub transform: Transform3x4,
    pub custom_index: u32,
    pub hit_group_offset: u32,
    pub mask: u8,
    pub flags: GeometryFlags,
}

#[derive(Debug, Clone)]
pub struct TlasBuildInfo {
    pub instances: Vec<InstanceRecord>,
    pub flags: AccelerationStructureBuildFlags,
}

#[derive(Debug, Clone, Copy)]
pub struct AccelerationStructureSizes {
    pub result_size: u64,
    pub scratch_size: u64,
}

impl AccelerationStructureSizes {
    pub fn align_up(self, align: u64) -> Self {
        let align = align.max(1);
        Self {
            result_size: self.result_size.div_ceil(align) * align,
            scratch_size: self.scratch_size.div_ceil(align) * align,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    Clone,
    Compact,
}

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Process-unique resource identifier, handed out by a relaxed-ordering
/// atomic counter on the owning device.
pub type ResourceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GpuType {
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct Gpu {
    pub name: String,
    pub ty: GpuType,
}

#[derive(Debug, Clone)]
pub struct Gpus {
    pub gpus: Vec<Gpu>,
    pub auto: Gpu,
    pub cur: Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    R8G8B8A8Unorm,
    B8G8R8A8Unorm,
    R16G16B16A16Sfloat,
    D32Sfloat,
    D24UnormS8Uint,
    R8Unorm,
    R32Uint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Graphics,
    Compute,
    Transfer,
    VideoDecode,
    VideoEncode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueuePriority {
    Low,
    Normal,
    High,
    Realtime,
}

impl QueuePriority {
    /// Fallback chain resolving the open question on priority selection:
    /// `Realtime -> High -> Normal -> Low`, stopping at the first class a
    /// queue actually exists for.
    pub const FALLBACK_CHAIN: [QueuePriority; 4] = [
        QueuePriority::Realtime,
        QueuePriority::High,
        QueuePriority::Normal,
        QueuePriority::Low,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    All,
    Draw,
    Compute,
    InputAssembly,
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    DepthStencil,
    Indirect,
    RenderTarget,
    Transfer,
    Resolve,
    Raytracing,
    AccelerationStructureBuild,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceAccess: u32 {
        const NONE = 0;
        const MEMORY_READ = 0b0001;
        const MEMORY_WRITE = 0b0010;
        const SHADER_READ = 0b0100;
        const SHADER_WRITE = 0b1000;
        const COMMON = Self::MEMORY_READ.bits() | Self::MEMORY_WRITE.bits();
        const SHADER_READ_WRITE = Self::SHADER_READ.bits() | Self::SHADER_WRITE.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Undefined,
    ReadWrite,
    ShaderResource,
    ColorAttachment,
    DepthRead,
    DepthWrite,
    TransferSrc,
    TransferDst,
    ResolveSource,
    ResolveDestination,
    Present,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 0b0000_0001;
        const TRANSFER_DST = 0b0000_0010;
        const VERTEX = 0b0000_0100;
        const INDEX = 0b0000_1000;
        const UNIFORM = 0b0001_0000;
        const STORAGE = 0b0010_0000;
        const INDIRECT = 0b0100_0000;
        const SHADER_BINDING_TABLE = 0b1000_0000;
        const ACCELERATION_STRUCTURE_BUILD_INPUT = 0b1_0000_0000;
        const ACCELERATION_STRUCTURE_STORAGE = 0b10_0000_0000;
        const ALLOW_WRITE = 0b100_0000_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 0b0001;
        const TRANSFER_DST = 0b0010;
        const SAMPLED = 0b0100;
        const STORAGE = 0b1000;
        const COLOR_ATTACHMENT = 0b0001_0000;
        const DEPTH_STENCIL_ATTACHMENT = 0b0010_0000;
        const INPUT_ATTACHMENT = 0b0100_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapClass {
    /// Device-local, not CPU visible.
    Resource,
    /// Host-visible, used for uploads.
    Staging,
    /// Host-visible and device-visible, for per-frame updated data.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    Storage,
    Indirect,
    ShaderBindingTable,
    AccelerationStructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimensionality {
    D1,
    D2,
    D3,
    Cube,
}

#[derive(Debug, Clone, Copy)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Offset2D {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct Rect2D {
    pub offset: Offset2D,
    pub extent: Extent2D,
}

#[derive(Debug, Clone, Copy)]
pub struct SubResource {
    pub plane: u32,
    pub mip_level: u32,
    pub array_layer: u32,
}

impl SubResource {
    /// Linear index given the image's full mip/array extents, matching the
    /// plane-major, then-array-layer, then-mip-level layout native APIs use.
    pub fn linear_index(&self, mip_levels: u32, array_layers: u32) -> u32 {
        self.plane * mip_levels * array_layers + self.array_layer * mip_levels + self.mip_level
    }
}

use std::sync::Arc;

use crate::error::{GfxError, GfxResult};
use crate::pipeline::layout::PipelineLayoutDescriptor;
use crate::pipeline::shader::ShaderProgram;
use crate::resource::MAX_COLOR_RENDER_TARGETS;
use crate::types::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullOrder {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Clone, Copy)]
pub struct StencilOpState {
    pub fail: StencilOp,
    pub pass: StencilOp,
    pub depth_fail: StencilOp,
    pub compare: CompareOp,
}

#[derive(Debug, Clone, Copy)]
pub struct DepthBias {
    pub enable: bool,
    pub clamp: f32,
    pub constant: f32,
    pub slope: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterizerState {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub cull_order: CullOrder,
    pub line_width: f32,
    pub depth_bias: DepthBias,
}

#[derive(Debug, Clone, Copy)]
pub struct DepthState {
    pub test_enable: bool,
    pub write_enable: bool,
    pub compare: CompareOp,
}

#[derive(Debug, Clone, Copy)]
pub struct StencilState {
    pub enable: bool,
    pub front: StencilOpState,
    pub back: StencilOpState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderTargetBlend {
    pub enable: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
    pub write_mask: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Uint16,
    Uint32,
}

#[derive(Debug, Clone, Default)]
pub struct GraphicsPipelineDescriptor {
    pub program: ShaderProgram,
    pub layout: PipelineLayoutDescriptor,
    pub rasterizer: Option<RasterizerState>,
    pub depth: Option<DepthState>,
    pub stencil: Option<StencilState>,
    pub topology: PrimitiveTopology2,
    pub index_type: IndexType2,
    pub color_formats: Vec<Format>,
    pub depth_stencil_format: Option<Format>,
    pub blend_states: Vec<RenderTargetBlend>,
    pub alpha_to_coverage: bool,
    pub sample_count: u32,
}

// Wrapper default carriers since the enums above intentionally have no
// natural "zero" variant.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveTopology2(pub PrimitiveTopology);
impl Default for PrimitiveTopology2 {
    fn default() -> Self {
        Self(PrimitiveTopology::TriangleList)
    }
}
#[derive(Debug, Clone, Copy)]
pub struct IndexType2(pub IndexType);
impl Default for IndexType2 {
    fn default() -> Self {
        Self(IndexType::Uint32)
    }
}

impl GraphicsPipelineDescriptor {
    pub fn is_mesh_pipeline(&self) -> bool {
        self.program.has_mesh_stage()
    }

    pub fn validate(&self) -> GfxResult<()> {
        if self.color_formats.len() > MAX_COLOR_RENDER_TARGETS {
            return Err(GfxError::invalid(format!(
                "too many render targets: {} > {}",
                self.color_formats.len(),
                MAX_COLOR_RENDER_TARGETS
            )));
        }
        Ok(())
    }
}

pub type SharedProgram = Arc<ShaderProgram>;

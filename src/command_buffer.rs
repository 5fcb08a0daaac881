use crate::acceleration_structure::{BlasBuildInfo, CopyMode, TlasBuildInfo};
use crate::barrier::Barrier;
use crate::descriptor::DescriptorSet;
use crate::error::{GfxError, GfxResult};
use crate::pipeline::raytracing::ShaderBindingTable;
use crate::pipeline::PushConstantLayout;
use crate::types::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    Initial,
    Recording,
    Executable,
    Submitted,
}

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct IndirectArgsLayout {
    pub stride: u64,
}

/// The core recording surface. A command buffer is not itself thread-safe —
/// one thread records it start to finish — but distinct command buffers may
/// be recorded concurrently from a thread pool.
pub trait CommandBuffer: Send {
    /// Lets a queue recover the concrete backend type before passing raw
    /// native handles to a submission call.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Mutable counterpart of [`CommandBuffer::as_any`], used when a device
    /// needs to record into a command buffer it does not itself own (e.g.
    /// binding global descriptor heaps).
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    fn state(&self) -> CommandBufferState;
    fn is_secondary(&self) -> bool;

    fn begin(&mut self) -> GfxResult<()>;
    fn end(&mut self) -> GfxResult<()>;

    fn set_viewports(&mut self, viewports: &[Viewport]);
    fn set_scissors(&mut self, scissors: &[crate::types::Rect2D]);
    fn set_blend_factor(&mut self, factor: [f32; 4]);
    fn set_stencil_ref(&mut self, reference: u32);

    fn barrier(&mut self, barrier: &Barrier) -> GfxResult<()>;

    fn transfer_buffer_to_buffer(
        &mut self,
        src: ResourceId,
        src_first_element: u64,
        dst: ResourceId,
        dst_first_element: u64,
        count: u64,
    ) -> GfxResult<()>;

    /// Writes `bytes` into a transient staging buffer and copies it into
    /// `dst`. The staging buffer is retained on this recording's shared list
    /// until the submission it is part of completes.
    fn transfer_from_memory(
        &mut self,
        bytes: &[u8],
        dst: ResourceId,
        dst_first_element: u64,
    ) -> GfxResult<()>;

    fn use_pipeline(&mut self, pipeline: ResourceId);

    fn bind_descriptor_sets(&mut self, first_set: u32, sets: &[&DescriptorSet]) -> GfxResult<()>;

    fn last_pipeline(&self) -> Option<ResourceId>;

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: ResourceId, offset: u64);
    fn bind_index_buffer(&mut self, buffer: ResourceId, offset: u64);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    fn dispatch(&mut self, x: u32, y: u32, z: u32);
    fn dispatch_mesh(&mut self, x: u32, y: u32, z: u32);

    /// Effective count is `min(max_batches, args_buffer.aligned_element_size / layout.stride)`.
    fn dispatch_indirect(
        &mut self,
        args_buffer: ResourceId,
        max_batches: u32,
        stride: IndirectArgsLayout,
        aligned_element_size: u64,
    ) -> GfxResult<u32> {
        let clamp = (aligned_element_size / stride.stride.max(1)) as u32;
        Ok(max_batches.min(clamp.max(1)))
    }

    /// Looks up the root parameter for each range in `layout`; ranges with
    /// no match are logged and skipped (a no-op), never an error.
    fn push_constants(&mut self, layout: &PushConstantLayout, data: &[u8]);

    fn write_timing_event(&mut self, slot: u32);

    fn execute_secondary(&mut self, secondary: &dyn CommandBuffer) -> GfxResult<()>;

    fn build_acceleration_structure_blas(
        &mut self,
        dst: ResourceId,
        scratch: ResourceId,
        info: &BlasBuildInfo,
    ) -> GfxResult<()>;

    fn build_acceleration_structure_tlas(
        &mut self,
        dst: ResourceId,
        scratch: ResourceId,
        info: &TlasBuildInfo,
    ) -> GfxResult<()>;

    /// Refits `dst` in place from `info` without rebuilding its hierarchy.
    /// Only valid if `dst` was originally built with `ALLOW_UPDATE`; backends
    /// do not themselves track that flag and trust the caller.
    fn update_acceleration_structure_tlas(
        &mut self,
        dst: ResourceId,
        scratch: ResourceId,
        info: &TlasBuildInfo,
    ) -> GfxResult<()>;

    fn copy_acceleration_structure(
        &mut self,
        src: ResourceId,
        dst: ResourceId,
        mode: CopyMode,
    ) -> GfxResult<()>;

    fn trace_rays(&mut self, table: &ShaderBindingTable, width: u32, height: u32, depth: u32) -> GfxResult<()>;

    fn release_shared_state(&mut self);
}

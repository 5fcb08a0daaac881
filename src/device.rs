use std::sync::Arc;

use crate::acceleration_structure::{AccelerationStructureSizes, BlasBuildInfo, TlasBuildInfo};
use crate::command_buffer::CommandBuffer;
use crate::config::{GfxOptions, RequiredFeatures};
use crate::descriptor::{DescriptorSet, DescriptorSetLayout};
use crate::error::GfxResult;
use crate::pipeline::{ComputePipelineDescriptor, GraphicsPipelineDescriptor, PipelineHandle, RayTracingPipelineDescriptor};
use crate::queue::Queue;
use crate::resource::{Buffer, Image};
use crate::swapchain::{SwapChain, SwapChainDescriptor};
use crate::types::{BufferKind, BufferUsage, Dimensionality, Extent3D, Format, Gpus, HeapClass, ImageUsage, QueueKind};

/// Owns the native device handle and is at the root of the ownership tree:
/// every other object (queue, resource, pipeline, render pass) holds either
/// a strong reference to the device or none at all, so reference cycles
/// never arise (see design notes on PIMPL back-pointers).
pub trait Device: Send + Sync {
    fn gpus(&self) -> Arc<Gpus>;
    fn options(&self) -> &GfxOptions;

    fn default_queue(&self, kind: QueueKind) -> Arc<dyn Queue>;

    fn create_buffer(
        &self,
        kind: BufferKind,
        heap_class: HeapClass,
        elements: u64,
        element_size: u64,
        usage: BufferUsage,
        debug_name: Option<&str>,
    ) -> GfxResult<Arc<Buffer>>;

    fn create_image(
        &self,
        format: Format,
        extent: Extent3D,
        dimensionality: Dimensionality,
        array_layers: u32,
        mip_levels: u32,
        samples: u32,
        usage: ImageUsage,
        debug_name: Option<&str>,
    ) -> GfxResult<Arc<Image>>;

    fn create_descriptor_set_layout(
        &self,
        layout: DescriptorSetLayout,
    ) -> GfxResult<Arc<DescriptorSetLayout>>;

    /// Allocates both buffer- and sampler-style slots for `layout` from the
    /// two process-wide global descriptor heaps, atomically.
    fn allocate_descriptor_set(&self, layout: &Arc<DescriptorSetLayout>) -> GfxResult<DescriptorSet>;

    fn release_descriptor_set(&self, set: DescriptorSet);

    fn update_buffer_descriptors(&self, set: &DescriptorSet) -> GfxResult<()>;
    fn update_sampler_descriptors(&self, set: &DescriptorSet) -> GfxResult<()>;

    /// Binds the process-wide GPU-visible descriptor heaps onto `cmd`. Must
    /// be called once per command buffer before any `bind_descriptor_set`.
    /// Backends with no heap-binding concept of their own (Vulkan's bindless
    /// layout, `null`) accept and ignore the call.
    fn bind_global_descriptor_heaps(&self, cmd: &mut dyn CommandBuffer) -> GfxResult<()>;

    /// Convenience wrapper over [`crate::command_buffer::CommandBuffer::bind_descriptor_sets`]
    /// for the common single-set case.
    fn bind_descriptor_set(
        &self,
        cmd: &mut dyn CommandBuffer,
        first_set: u32,
        set: &DescriptorSet,
    ) -> GfxResult<()> {
        cmd.bind_descriptor_sets(first_set, &[set])
    }

    fn create_graphics_pipeline(&self, desc: GraphicsPipelineDescriptor) -> GfxResult<PipelineHandle>;
    fn create_compute_pipeline(&self, desc: ComputePipelineDescriptor) -> GfxResult<PipelineHandle>;
    fn create_raytracing_pipeline(&self, desc: RayTracingPipelineDescriptor) -> GfxResult<PipelineHandle>;

    fn create_swap_chain(&self, desc: SwapChainDescriptor) -> GfxResult<Arc<dyn SwapChain>>;

    fn compute_acceleration_structure_sizes_blas(&self, info: &BlasBuildInfo) -> GfxResult<AccelerationStructureSizes>;
    fn compute_acceleration_structure_sizes_tlas(&self, info: &TlasBuildInfo) -> GfxResult<AccelerationStructureSizes>;

    /// Blocks on every queue in parallel until each has retired all
    /// outstanding work.
    fn wait(&self) -> GfxResult<()>;

    fn max_multi_sampling_level(&self, format: Format) -> u32;
    fn ticks_per_millisecond(&self) -> u64;

    fn required_features(&self) -> &RequiredFeatures;
}

//! A pure-Rust, in-memory stand-in for a native backend. It exists so the
//! invariants in the testable-properties set can be exercised without a GPU
//! or a windowing system; it is not a production backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use parking_lot::Mutex as PLMutex;

use std::collections::BTreeMap;

use crate::acceleration_structure::{AccelerationStructureSizes, BlasBuildInfo, CopyMode, TlasBuildInfo};
use crate::barrier::{self, Barrier};
use crate::command_buffer::{CommandBuffer, CommandBufferState, IndirectArgsLayout, Viewport};
use crate::config::{GfxOptions, RequiredFeatures};
use crate::descriptor::{DescriptorSet, DescriptorSetLayout, GlobalDescriptorAllocator};
use crate::device::Device;
use crate::error::{GfxError, GfxResult};
use crate::pipeline::raytracing::ShaderBindingTable;
use crate::pipeline::{ComputePipelineDescriptor, GraphicsPipelineDescriptor, PipelineHandle, PipelineKind, PushConstantLayout, RayTracingPipelineDescriptor};
use crate::queue::{FenceValue, Queue};
use crate::resource::{Buffer, Image};
use crate::swapchain::{SwapChain, SwapChainDescriptor, SwapChainResetEvent};
use crate::types::{BufferKind, BufferUsage, Dimensionality, Extent3D, Format, Gpu, GpuType, Gpus, HeapClass, ImageUsage, QueueKind, QueuePriority, Rect2D, ResourceId};

fn next_id(counter: &AtomicU64) -> ResourceId {
    counter.fetch_add(1, Ordering::Relaxed)
}

pub struct NullQueue {
    kind: QueueKind,
    priority: QueuePriority,
    fence: AtomicU64,
    submit_lock: PLMutex<()>,
    id_counter: Arc<AtomicU64>,
}

impl NullQueue {
    fn new(kind: QueueKind, priority: QueuePriority, id_counter: Arc<AtomicU64>) -> Self {
        Self {
            kind,
            priority,
            fence: AtomicU64::new(0),
            submit_lock: PLMutex::new(()),
            id_counter,
        }
    }
}

impl Queue for NullQueue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn priority(&self) -> QueuePriority {
        self.priority
    }

    fn create_command_buffer(&self, secondary: bool) -> GfxResult<Box<dyn CommandBuffer>> {
        Ok(Box::new(NullCommandBuffer::new(secondary, self.id_counter.clone())))
    }

    fn submit(&self, buffers: &[&dyn CommandBuffer]) -> GfxResult<FenceValue> {
        let _guard = self.submit_lock.lock();
        for buf in buffers {
            if buf.is_secondary() {
                // secondaries are fine as part of a render-pass submission list
                continue;
            }
            if buf.state() != CommandBufferState::Executable {
                return Err(GfxError::runtime(
                    "command buffer submitted while not in the executable state",
                ));
            }
        }
        Ok(self.fence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn wait_for(&self, value: FenceValue) -> GfxResult<()> {
        // The null backend executes synchronously in `submit`, so any
        // requested value has already been reached.
        if value > self.fence.load(Ordering::SeqCst) {
            return Err(GfxError::runtime("wait_for value never reached"));
        }
        Ok(())
    }

    fn wait_for_queue(&self, other: &dyn Queue, value: FenceValue) -> GfxResult<()> {
        other.wait_for(value)
    }

    fn current_value(&self) -> FenceValue {
        self.fence.load(Ordering::SeqCst)
    }
}

pub struct NullCommandBuffer {
    secondary: bool,
    state: CommandBufferState,
    last_pipeline: Option<ResourceId>,
    id_counter: Arc<AtomicU64>,
    shared_resources: Vec<ResourceId>,
    bound_descriptor_sets: BTreeMap<u32, ResourceId>,
    bound_vertex_buffers: BTreeMap<u32, (ResourceId, u64)>,
    bound_index_buffer: Option<(ResourceId, u64)>,
    last_push_constants: Vec<u8>,
    timing_events: Vec<u32>,
    mesh_dispatches: Vec<(u32, u32, u32)>,
    buffer_copies: Vec<(ResourceId, u64, ResourceId, u64, u64)>,
    acceleration_builds: Vec<ResourceId>,
    acceleration_copies: Vec<(ResourceId, ResourceId, CopyMode)>,
    trace_ray_dispatches: Vec<(u32, u32, u32)>,
}

impl NullCommandBuffer {
    fn new(secondary: bool, id_counter: Arc<AtomicU64>) -> Self {
        Self {
            secondary,
            state: CommandBufferState::Initial,
            last_pipeline: None,
            id_counter,
            shared_resources: Vec::new(),
            bound_descriptor_sets: BTreeMap::new(),
            bound_vertex_buffers: BTreeMap::new(),
            bound_index_buffer: None,
            last_push_constants: Vec::new(),
            timing_events: Vec::new(),
            mesh_dispatches: Vec::new(),
            buffer_copies: Vec::new(),
            acceleration_builds: Vec::new(),
            acceleration_copies: Vec::new(),
            trace_ray_dispatches: Vec::new(),
        }
    }
}

impl CommandBuffer for NullCommandBuffer {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn state(&self) -> CommandBufferState {
        self.state
    }

    fn is_secondary(&self) -> bool {
        self.secondary
    }

    fn begin(&mut self) -> GfxResult<()> {
        if self.state != CommandBufferState::Initial {
            return Err(GfxError::runtime("begin() called outside the initial state"));
        }
        self.state = CommandBufferState::Recording;
        Ok(())
    }

    fn end(&mut self) -> GfxResult<()> {
        if self.state != CommandBufferState::Recording {
            return Err(GfxError::runtime("end() called outside the recording state"));
        }
        self.state = CommandBufferState::Executable;
        Ok(())
    }

    fn set_viewports(&mut self, _viewports: &[Viewport]) {}
    fn set_scissors(&mut self, _scissors: &[Rect2D]) {}
    fn set_blend_factor(&mut self, _factor: [f32; 4]) {}
    fn set_stencil_ref(&mut self, _reference: u32) {}

    fn barrier(&mut self, barrier_desc: &Barrier) -> GfxResult<()> {
        barrier::apply_all(barrier_desc)
    }

    fn transfer_buffer_to_buffer(
        &mut self,
        src: ResourceId,
        src_first_element: u64,
        dst: ResourceId,
        dst_first_element: u64,
        count: u64,
    ) -> GfxResult<()> {
        self.shared_resources.push(dst);
        self.buffer_copies.push((src, src_first_element, dst, dst_first_element, count));
        Ok(())
    }

    fn transfer_from_memory(&mut self, _bytes: &[u8], dst: ResourceId, _dst_first_element: u64) -> GfxResult<()> {
        let staging = next_id(&self.id_counter);
        self.shared_resources.push(staging);
        self.shared_resources.push(dst);
        Ok(())
    }

    fn use_pipeline(&mut self, pipeline: ResourceId) {
        self.last_pipeline = Some(pipeline);
    }

    fn last_pipeline(&self) -> Option<ResourceId> {
        self.last_pipeline
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: ResourceId, offset: u64) {
        self.bound_vertex_buffers.insert(binding, (buffer, offset));
    }
    fn bind_index_buffer(&mut self, buffer: ResourceId, offset: u64) {
        self.bound_index_buffer = Some((buffer, offset));
    }

    fn draw(&mut self, _vertex_count: u32, _instance_count: u32, _first_vertex: u32, _first_instance: u32) {}
    fn draw_indexed(
        &mut self,
        _index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
    }
    fn dispatch(&mut self, _x: u32, _y: u32, _z: u32) {}
    fn dispatch_mesh(&mut self, x: u32, y: u32, z: u32) {
        self.mesh_dispatches.push((x, y, z));
    }

    fn push_constants(&mut self, _layout: &PushConstantLayout, data: &[u8]) {
        self.last_push_constants = data.to_vec();
    }

    fn write_timing_event(&mut self, slot: u32) {
        self.timing_events.push(slot);
    }

    fn bind_descriptor_sets(&mut self, first_set: u32, sets: &[&DescriptorSet]) -> GfxResult<()> {
        if self.last_pipeline().is_none() {
            return Err(GfxError::runtime("bind_descriptor_sets called before use_pipeline"));
        }
        for (i, set) in sets.iter().enumerate() {
            self.bound_descriptor_sets.insert(first_set + i as u32, set.id);
        }
        Ok(())
    }

    fn execute_secondary(&mut self, secondary: &dyn CommandBuffer) -> GfxResult<()> {
        if !secondary.is_secondary() {
            return Err(GfxError::runtime("execute_secondary requires a secondary command buffer"));
        }
        Ok(())
    }

    fn build_acceleration_structure_blas(
        &mut self,
        dst: ResourceId,
        scratch: ResourceId,
        _info: &BlasBuildInfo,
    ) -> GfxResult<()> {
        self.shared_resources.push(scratch);
        self.acceleration_builds.push(dst);
        Ok(())
    }

    fn build_acceleration_structure_tlas(
        &mut self,
        dst: ResourceId,
        scratch: ResourceId,
        _info: &TlasBuildInfo,
    ) -> GfxResult<()> {
        self.shared_resources.push(scratch);
        self.acceleration_builds.push(dst);
        Ok(())
    }

    fn update_acceleration_structure_tlas(
        &mut self,
        dst: ResourceId,
        scratch: ResourceId,
        _info: &TlasBuildInfo,
    ) -> GfxResult<()> {
        self.shared_resources.push(scratch);
        self.acceleration_builds.push(dst);
        Ok(())
    }

    fn copy_acceleration_structure(&mut self, src: ResourceId, dst: ResourceId, mode: CopyMode) -> GfxResult<()> {
        self.acceleration_copies.push((src, dst, mode));
        Ok(())
    }

    fn trace_rays(&mut self, _table: &ShaderBindingTable, width: u32, height: u32, depth: u32) -> GfxResult<()> {
        self.trace_ray_dispatches.push((width, height, depth));
        Ok(())
    }

    fn release_shared_state(&mut self) {
        self.shared_resources.clear();
    }
}

pub struct NullSwapChain {
    descriptor: Mutex<SwapChainDescriptor>,
    next_image: AtomicU64,
    listeners: Mutex<Vec<Box<dyn Fn(SwapChainResetEvent) + Send + Sync>>>,
}

impl SwapChain for NullSwapChain {
    fn descriptor(&self) -> SwapChainDescriptor {
        *self.descriptor.lock().unwrap()
    }

    fn acquire_next(&self) -> GfxResult<u32> {
        let descriptor = self.descriptor();
        let idx = self.next_image.fetch_add(1, Ordering::SeqCst) % descriptor.back_buffer_count as u64;
        Ok(idx as u32)
    }

    fn present(&self, _wait_on: FenceValue) -> GfxResult<()> {
        Ok(())
    }

    fn reset(&self, new: SwapChainDescriptor) -> GfxResult<()> {
        let old = {
            let mut d = self.descriptor.lock().unwrap();
            let old = *d;
            *d = new;
            old
        };
        for listener in self.listeners.lock().unwrap().iter() {
            listener(SwapChainResetEvent { old, new });
        }
        Ok(())
    }

    fn on_reset(&self, f: Box<dyn Fn(SwapChainResetEvent) + Send + Sync>) {
        self.listeners.lock().unwrap().push(f);
    }
}

pub struct NullDevice {
    options: GfxOptions,
    required_features: RequiredFeatures,
    gpus: Arc<Gpus>,
    id_counter: Arc<AtomicU64>,
    queues: HashMap<QueueKind, Arc<dyn Queue>>,
    descriptors: Arc<GlobalDescriptorAllocator>,
}

impl NullDevice {
    pub fn new(options: GfxOptions, required_features: RequiredFeatures) -> Arc<Self> {
        let id_counter = Arc::new(AtomicU64::new(1));
        let mut queues: HashMap<QueueKind, Arc<dyn Queue>> = HashMap::new();
        queues.insert(
            QueueKind::Graphics,
            Arc::new(NullQueue::new(QueueKind::Graphics, QueuePriority::Normal, id_counter.clone())),
        );
        queues.insert(
            QueueKind::Transfer,
            Arc::new(NullQueue::new(QueueKind::Transfer, QueuePriority::Normal, id_counter.clone())),
        );
        queues.insert(
            QueueKind::Compute,
            Arc::new(NullQueue::new(QueueKind::Compute, QueuePriority::Normal, id_counter.clone())),
        );
        let gpus = Arc::new(Gpus {
            gpus: vec![Gpu {
                name: "null".to_string(),
                ty: GpuType::Cpu,
            }],
            auto: Gpu {
                name: "null".to_string(),
                ty: GpuType::Cpu,
            },
            cur: Gpu {
                name: "null".to_string(),
                ty: GpuType::Cpu,
            },
        });
        Arc::new(Self {
            options,
            required_features,
            gpus,
            id_counter,
            queues,
            descriptors: Arc::new(GlobalDescriptorAllocator::new(1_000_000)),
        })
    }
}

impl Device for NullDevice {
    fn gpus(&self) -> Arc<Gpus> {
        self.gpus.clone()
    }

    fn options(&self) -> &GfxOptions {
        &self.options
    }

    fn default_queue(&self, kind: QueueKind) -> Arc<dyn Queue> {
        self.queues
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.queues[&QueueKind::Graphics].clone())
    }

    fn create_buffer(
        &self,
        kind: BufferKind,
        heap_class: HeapClass,
        elements: u64,
        element_size: u64,
        usage: BufferUsage,
        debug_name: Option<&str>,
    ) -> GfxResult<Arc<Buffer>> {
        let align = 256u64;
        Ok(Arc::new(Buffer::new(
            next_id(&self.id_counter),
            debug_name.map(str::to_string),
            kind,
            heap_class,
            elements,
            element_size,
            align,
            usage,
        )?))
    }

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
    ) -> GfxResult<Arc<Image>> {
        Ok(Arc::new(Image::new(
            next_id(&self.id_counter),
            debug_name.map(str::to_string),
            format,
            extent,
            dimensionality,
            array_layers,
            mip_levels,
            samples,
            usage,
        )))
    }

    fn create_descriptor_set_layout(&self, layout: DescriptorSetLayout) -> GfxResult<Arc<DescriptorSetLayout>> {
        Ok(Arc::new(layout))
    }

    fn allocate_descriptor_set(&self, layout: &Arc<DescriptorSetLayout>) -> GfxResult<DescriptorSet> {
        let (buffers, samplers) = layout.slot_counts();
        let (buffer_range, sampler_range) = self.descriptors.allocate(buffers, samplers)?;
        Ok(DescriptorSet {
            id: next_id(&self.id_counter),
            layout: layout.clone(),
            buffer_range,
            sampler_range,
            bindings: HashMap::new(),
        })
    }

    fn release_descriptor_set(&self, set: DescriptorSet) {
        self.descriptors.release(set.buffer_range, set.sampler_range);
    }

    fn update_buffer_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        self.descriptors.update_buffer_descriptors(set)
    }

    fn update_sampler_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        self.descriptors.update_sampler_descriptors(set)
    }

    fn bind_global_descriptor_heaps(&self, _cmd: &mut dyn CommandBuffer) -> GfxResult<()> {
        // the null backend has no heap-binding concept; descriptors are
        // shadowed directly in `GlobalDescriptorAllocator`.
        Ok(())
    }

    fn create_graphics_pipeline(&self, desc: GraphicsPipelineDescriptor) -> GfxResult<PipelineHandle> {
        desc.validate()?;
        let kind = if desc.is_mesh_pipeline() {
            PipelineKind::Mesh
        } else {
            PipelineKind::Graphics
        };
        Ok(PipelineHandle {
            id: next_id(&self.id_counter),
            kind,
        })
    }

    fn create_compute_pipeline(&self, _desc: ComputePipelineDescriptor) -> GfxResult<PipelineHandle> {
        Ok(PipelineHandle {
            id: next_id(&self.id_counter),
            kind: PipelineKind::Compute,
        })
    }

    fn create_raytracing_pipeline(&self, _desc: RayTracingPipelineDescriptor) -> GfxResult<PipelineHandle> {
        if !self.required_features.ray_tracing {
            return Err(GfxError::invalid("ray tracing was not requested in RequiredFeatures"));
        }
        Ok(PipelineHandle {
            id: next_id(&self.id_counter),
            kind: PipelineKind::RayTracing,
        })
    }

    fn create_swap_chain(&self, desc: SwapChainDescriptor) -> GfxResult<Arc<dyn SwapChain>> {
        Ok(Arc::new(NullSwapChain {
            descriptor: Mutex::new(desc),
            next_image: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }))
    }

    fn compute_acceleration_structure_sizes_blas(&self, info: &BlasBuildInfo) -> GfxResult<AccelerationStructureSizes> {
        let vertex_bytes: u64 = info
            .geometries
            .iter()
            .map(|g| g.vertex_count as u64 * g.vertex_stride as u64)
            .sum();
        Ok(AccelerationStructureSizes {
            result_size: vertex_bytes * 2,
            scratch_size: vertex_bytes,
        }
        .align_up(256))
    }

    fn compute_acceleration_structure_sizes_tlas(&self, info: &TlasBuildInfo) -> GfxResult<AccelerationStructureSizes> {
        let instance_bytes = info.instances.len() as u64 * 64;
        Ok(AccelerationStructureSizes {
            result_size: instance_bytes * 2,
            scratch_size: instance_bytes,
        }
        .align_up(256))
    }

    fn wait(&self) -> GfxResult<()> {
        for queue in self.queues.values() {
            queue.wait_for(queue.current_value())?;
        }
        Ok(())
    }

    fn max_multi_sampling_level(&self, _format: Format) -> u32 {
        1
    }

    fn ticks_per_millisecond(&self) -> u64 {
        1_000_000
    }

    fn required_features(&self) -> &RequiredFeatures {
        &self.required_features
    }
}

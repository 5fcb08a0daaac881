use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::info;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::D3D_FEATURE_LEVEL_12_0;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::*;

use crate::acceleration_structure::{AccelerationStructureSizes, BlasBuildInfo, TlasBuildInfo};
use crate::config::{GfxOptions, RequiredFeatures};
use crate::descriptor::{DescriptorSet, DescriptorSetLayout};
use crate::device::Device;
use crate::error::{GfxError, GfxResult};
use crate::pipeline::{ComputePipelineDescriptor, GraphicsPipelineDescriptor, PipelineHandle, PipelineKind, RayTracingPipelineDescriptor};
use crate::queue::Queue;
use crate::resource::{Buffer, Image};
use crate::surface::SurfaceSource;
use crate::swapchain::{SwapChain, SwapChainDescriptor};
use crate::types::{BufferKind, BufferUsage, Dimensionality, Extent3D, Format, Gpu, GpuType, Gpus, HeapClass, ImageUsage, QueueKind};

use super::descriptor::Dx12DescriptorHeap;
use super::queue::Dx12Queue;
use super::swapchain::Dx12SwapChain;

const BUFFER_HEAP_SIZE: u32 = 1_000_000;
const SAMPLER_HEAP_SIZE: u32 = 2048;

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed)
}

fn queue_list_type(kind: QueueKind) -> D3D12_COMMAND_LIST_TYPE {
    match kind {
        QueueKind::Compute => D3D12_COMMAND_LIST_TYPE_COMPUTE,
        QueueKind::Transfer | QueueKind::VideoDecode | QueueKind::VideoEncode => D3D12_COMMAND_LIST_TYPE_COPY,
        QueueKind::Graphics => D3D12_COMMAND_LIST_TYPE_DIRECT,
    }
}

/// Enumerates `IDXGIAdapter1`s via the factory, ranking by dedicated video
/// memory the way the Vulkan-like backend ranks by `VkPhysicalDeviceType`:
/// any adapter reporting dedicated VRAM outranks one that doesn't (a
/// reasonable proxy for discrete vs. integrated on DX12, which has no
/// direct equivalent of `VK_PHYSICAL_DEVICE_TYPE_DISCRETE_GPU`), and the
/// `DXGI_ADAPTER_FLAG_SOFTWARE` bit always loses to both.
fn select_adapter(factory: &IDXGIFactory4, options: &GfxOptions) -> GfxResult<(IDXGIAdapter1, Gpus)> {
    let mut candidates = Vec::new();
    let mut index = 0u32;
    loop {
        let adapter: IDXGIAdapter1 = match unsafe { factory.EnumAdapters1(index) } {
            Ok(a) => a,
            Err(_) => break,
        };
        let desc = unsafe { adapter.GetDesc1() }.map_err(|e| GfxError::native("IDXGIAdapter1::GetDesc1", e.code().0))?;
        let name = String::from_utf16_lossy(&desc.Description).trim_end_matches('\0').to_string();
        let ty = if desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32 != 0 {
            GpuType::Cpu
        } else if desc.DedicatedVideoMemory > 0 {
            GpuType::Discrete
        } else {
            GpuType::Integrated
        };
        candidates.push((adapter, Gpu { name, ty }));
        index += 1;
    }
    if candidates.is_empty() {
        return Err(GfxError::runtime("no DXGI adapters enumerated"));
    }

    let gpus: Vec<Gpu> = candidates.iter().map(|(_, g)| g.clone()).collect();

    let chosen_index = if options.gpu != "auto" {
        candidates
            .iter()
            .position(|(_, g)| g.name == options.gpu)
            .ok_or_else(|| GfxError::invalid(format!("no adapter named '{}'", options.gpu)))?
    } else {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, (_, g))| g.ty)
            .map(|(i, _)| i)
            .expect("candidates is non-empty")
    };

    let (adapter, gpu) = candidates.swap_remove(chosen_index);
    let auto = gpus.iter().min_by_key(|g| g.ty).cloned().unwrap_or_else(|| gpu.clone());
    Ok((
        adapter,
        Gpus {
            gpus,
            auto,
            cur: gpu,
        },
    ))
}

pub struct Dx12Device {
    pub raw: ID3D12Device,
    factory: IDXGIFactory4,
    gpus: Gpus,
    options: GfxOptions,
    required_features: RequiredFeatures,
    queues: HashMap<QueueKind, Arc<dyn Queue>>,
    id_counter: Arc<AtomicU64>,
    cbv_srv_uav_heap: Arc<Dx12DescriptorHeap>,
    sampler_heap: Arc<Dx12DescriptorHeap>,
    hwnd: Option<HWND>,
    graphics_queue_raw: ID3D12CommandQueue,
}

impl Dx12Device {
    pub fn new(options: GfxOptions, required_features: RequiredFeatures, surface_source: SurfaceSource<'_>) -> GfxResult<Arc<Self>> {
        if options.dbg.is_enabled() {
            if let Ok(debug) = unsafe { D3D12GetDebugInterface::<ID3D12Debug>() } {
                unsafe { debug.EnableDebugLayer() };
            }
        }

        let factory: IDXGIFactory4 = unsafe { CreateDXGIFactory2(0) }.map_err(|e| GfxError::native("CreateDXGIFactory2", e.code().0))?;
        let (adapter, gpus) = select_adapter(&factory, &options)?;

        let mut raw: Option<ID3D12Device> = None;
        unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_12_0, &mut raw) }
            .map_err(|e| GfxError::native("D3D12CreateDevice", e.code().0))?;
        let raw = raw.ok_or_else(|| GfxError::runtime("D3D12CreateDevice reported success with no device"))?;

        info!("created dx12 device on {}", gpus.cur.name);

        let mut queues: HashMap<QueueKind, Arc<dyn Queue>> = HashMap::new();
        let make_native_queue = |kind: QueueKind| -> GfxResult<ID3D12CommandQueue> {
            let desc = D3D12_COMMAND_QUEUE_DESC {
                Type: queue_list_type(kind),
                Priority: 0,
                Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
                NodeMask: 0,
            };
            unsafe { raw.CreateCommandQueue(&desc) }.map_err(|e| GfxError::native("CreateCommandQueue", e.code().0))
        };

        let graphics_native = make_native_queue(QueueKind::Graphics)?;
        let graphics_queue_raw = graphics_native.clone();
        queues.insert(
            QueueKind::Graphics,
            Arc::new(Dx12Queue::new(raw.clone(), graphics_native, QueueKind::Graphics, crate::types::QueuePriority::Normal)?) as Arc<dyn Queue>,
        );
        queues.insert(
            QueueKind::Compute,
            Arc::new(Dx12Queue::new(
                raw.clone(),
                make_native_queue(QueueKind::Compute)?,
                QueueKind::Compute,
                crate::types::QueuePriority::Normal,
            )?) as Arc<dyn Queue>,
        );
        queues.insert(
            QueueKind::Transfer,
            Arc::new(Dx12Queue::new(
                raw.clone(),
                make_native_queue(QueueKind::Transfer)?,
                QueueKind::Transfer,
                crate::types::QueuePriority::Normal,
            )?) as Arc<dyn Queue>,
        );

        let cbv_srv_uav_heap = Arc::new(Dx12DescriptorHeap::new(&raw, D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV, BUFFER_HEAP_SIZE)?);
        let sampler_heap = Arc::new(Dx12DescriptorHeap::new(&raw, D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER, SAMPLER_HEAP_SIZE)?);

        let hwnd = match surface_source {
            SurfaceSource::Window(handle) => match handle.window_handle().map_err(|e| GfxError::runtime(e.to_string()))?.as_raw() {
                RawWindowHandle::Win32(h) => Some(HWND(h.hwnd.get())),
                _ => return Err(GfxError::invalid("dx12 backend requires a Win32 window handle")),
            },
            SurfaceSource::Headless => None,
        };

        Ok(Arc::new(Self {
            raw,
            factory,
            gpus,
            options,
            required_features,
            queues,
            id_counter: Arc::new(AtomicU64::new(1)),
            cbv_srv_uav_heap,
            sampler_heap,
            hwnd,
            graphics_queue_raw,
        }))
    }
}

impl Device for Dx12Device {
    fn gpus(&self) -> Arc<Gpus> {
        Arc::new(self.gpus.clone())
    }

    fn options(&self) -> &GfxOptions {
        &self.options
    }

    fn default_queue(&self, kind: QueueKind) -> Arc<dyn Queue> {
        self.queues.get(&kind).cloned().unwrap_or_else(|| self.queues[&QueueKind::Graphics].clone())
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
        const D3D12_CONSTANT_BUFFER_ALIGNMENT: u64 = 256;
        Ok(Arc::new(Buffer::new(
            next_id(&self.id_counter),
            debug_name.map(str::to_string),
            kind,
            heap_class,
            elements,
            element_size,
            D3D12_CONSTANT_BUFFER_ALIGNMENT,
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
        let buffer_range = if buffers > 0 { (self.cbv_srv_uav_heap.allocate(buffers)?, buffers) } else { (0, 0) };
        let sampler_range = if samplers > 0 { (self.sampler_heap.allocate(samplers)?, samplers) } else { (0, 0) };
        Ok(DescriptorSet {
            id: next_id(&self.id_counter),
            layout: layout.clone(),
            buffer_range,
            sampler_range,
            bindings: HashMap::new(),
        })
    }

    fn release_descriptor_set(&self, set: DescriptorSet) {
        if set.buffer_range.1 > 0 {
            self.cbv_srv_uav_heap.release(set.buffer_range.0, set.buffer_range.1);
        }
        if set.sampler_range.1 > 0 {
            self.sampler_heap.release(set.sampler_range.0, set.sampler_range.1);
        }
    }

    fn update_buffer_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        self.cbv_srv_uav_heap.update_descriptors(set, set.buffer_range, false)
    }

    fn update_sampler_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        self.sampler_heap.update_descriptors(set, set.sampler_range, true)
    }

    fn bind_global_descriptor_heaps(&self, cmd: &mut dyn crate::command_buffer::CommandBuffer) -> GfxResult<()> {
        let dx_cmd = cmd
            .as_any_mut()
            .downcast_mut::<super::command_buffer::Dx12CommandBuffer>()
            .ok_or_else(|| GfxError::runtime("command buffer does not belong to this backend"))?;
        let heaps = [Some(self.cbv_srv_uav_heap.raw.clone()), Some(self.sampler_heap.raw.clone())];
        unsafe { dx_cmd.raw.SetDescriptorHeaps(&heaps) };
        Ok(())
    }

    fn create_graphics_pipeline(&self, desc: GraphicsPipelineDescriptor) -> GfxResult<PipelineHandle> {
        desc.validate()?;
        let kind = if desc.is_mesh_pipeline() { PipelineKind::Mesh } else { PipelineKind::Graphics };
        Ok(PipelineHandle { id: next_id(&self.id_counter), kind })
    }

    fn create_compute_pipeline(&self, _desc: ComputePipelineDescriptor) -> GfxResult<PipelineHandle> {
        Ok(PipelineHandle { id: next_id(&self.id_counter), kind: PipelineKind::Compute })
    }

    fn create_raytracing_pipeline(&self, _desc: RayTracingPipelineDescriptor) -> GfxResult<PipelineHandle> {
        if !self.required_features.ray_tracing {
            return Err(GfxError::invalid("ray tracing was not requested in RequiredFeatures"));
        }
        Ok(PipelineHandle { id: next_id(&self.id_counter), kind: PipelineKind::RayTracing })
    }

    fn create_swap_chain(&self, desc: SwapChainDescriptor) -> GfxResult<Arc<dyn SwapChain>> {
        let hwnd = self.hwnd.ok_or_else(|| GfxError::invalid("device was created headless; no window to build a swap chain on"))?;
        Ok(Arc::new(Dx12SwapChain::new(self.factory.clone(), hwnd, self.graphics_queue_raw.clone(), desc)?))
    }

    fn compute_acceleration_structure_sizes_blas(&self, info: &BlasBuildInfo) -> GfxResult<AccelerationStructureSizes> {
        let vertex_bytes: u64 = info.geometries.iter().map(|g| g.vertex_count as u64 * g.vertex_stride as u64).sum();
        Ok(AccelerationStructureSizes {
            result_size: vertex_bytes * 2,
            scratch_size: vertex_bytes,
        }
        .align_up(D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BYTE_ALIGNMENT as u64))
    }

    fn compute_acceleration_structure_sizes_tlas(&self, info: &TlasBuildInfo) -> GfxResult<AccelerationStructureSizes> {
        let instance_bytes = info.instances.len() as u64 * 64;
        Ok(AccelerationStructureSizes {
            result_size: instance_bytes * 2,
            scratch_size: instance_bytes,
        }
        .align_up(D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BYTE_ALIGNMENT as u64))
    }

    fn wait(&self) -> GfxResult<()> {
        use rayon::prelude::*;
        self.queues.values().collect::<Vec<_>>().par_iter().try_for_each(|queue| queue.wait_for(queue.current_value()))
    }

    fn max_multi_sampling_level(&self, format: Format) -> u32 {
        for level in [64u32, 32, 16, 8, 4, 2] {
            let mut info = D3D12_FEATURE_DATA_MULTISAMPLE_QUALITY_LEVELS {
                Format: super::swapchain::to_dxgi_format(format),
                SampleCount: level,
                Flags: D3D12_MULTISAMPLE_QUALITY_LEVELS_FLAG_NONE,
                NumQualityLevels: 0,
            };
            let ok = unsafe {
                self.raw.CheckFeatureSupport(
                    D3D12_FEATURE_MULTISAMPLE_QUALITY_LEVELS,
                    &mut info as *mut _ as *mut _,
                    std::mem::size_of_val(&info) as u32,
                )
            };
            if ok.is_ok() && info.NumQualityLevels > 0 {
                return level;
            }
        }
        1
    }

    fn ticks_per_millisecond(&self) -> u64 {
        1_000_000
    }

    fn required_features(&self) -> &RequiredFeatures {
        &self.required_features
    }
}

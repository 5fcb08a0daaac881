use std::collections::HashMap;

use windows::Win32::Graphics::Direct3D12::*;

use crate::descriptor::set::is_sampler_binding;
use crate::descriptor::{BoundView, DescriptorHeapAllocator, DescriptorSet};
use crate::error::{GfxError, GfxResult};

/// A process-wide `ID3D12DescriptorHeap` (shader-visible) plus the
/// fragment-list sub-allocator from `crate::descriptor::heap` that assigns
/// ranges within it. This is the literal "global descriptor heap" the core
/// describes for the DX12-like backend.
pub struct Dx12DescriptorHeap {
    pub raw: ID3D12DescriptorHeap,
    pub increment: u32,
    allocator: parking_lot::Mutex<DescriptorHeapAllocator>,
    /// Shadow copy of what `CopyDescriptorsSimple` would have written into
    /// this heap, keyed by absolute slot. No native view object is ever
    /// created from a logical-only buffer or image, so this table is where
    /// `update_buffer_descriptors`/`update_sampler_descriptors` land.
    table: parking_lot::Mutex<HashMap<u32, BoundView>>,
}

unsafe impl Send for Dx12DescriptorHeap {}
unsafe impl Sync for Dx12DescriptorHeap {}

impl Dx12DescriptorHeap {
    pub fn new(device: &ID3D12Device, ty: D3D12_DESCRIPTOR_HEAP_TYPE, capacity: u32) -> GfxResult<Self> {
        let desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: ty,
            NumDescriptors: capacity,
            Flags: D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE,
            NodeMask: 0,
        };
        let raw: ID3D12DescriptorHeap = unsafe { device.CreateDescriptorHeap(&desc) }
            .map_err(|e| GfxError::native("CreateDescriptorHeap", e.code().0))?;
        let increment = unsafe { device.GetDescriptorHandleIncrementSize(ty) };
        Ok(Self {
            raw,
            increment,
            allocator: parking_lot::Mutex::new(DescriptorHeapAllocator::new(capacity)),
            table: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    pub fn allocate(&self, count: u32) -> GfxResult<u32> {
        if count == 0 {
            return Ok(0);
        }
        self.allocator.lock().allocate(count)
    }

    pub fn release(&self, offset: u32, count: u32) {
        if count > 0 {
            self.allocator.lock().release(offset, count);
        }
    }

    pub fn cpu_handle(&self, offset: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        let base = unsafe { self.raw.GetCPUDescriptorHandleForHeapStart() };
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: base.ptr + (offset * self.increment) as usize,
        }
    }

    pub fn gpu_handle(&self, offset: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        let base = unsafe { self.raw.GetGPUDescriptorHandleForHeapStart() };
        D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: base.ptr + (offset * self.increment) as u64,
        }
    }

    /// Copies every binding in `set` that belongs in this heap (buffer-style
    /// bindings for the CBV/SRV/UAV heap, sampler bindings for the sampler
    /// heap) into the shadow table at `range.0 + register`, the slot
    /// arithmetic a real `CopyDescriptorsSimple` write would target.
    pub fn update_descriptors(&self, set: &DescriptorSet, range: (u32, u32), wants_sampler: bool) -> GfxResult<()> {
        let mut table = self.table.lock();
        for (register, view) in &set.bindings {
            if is_sampler_binding(&set.layout, *register) != wants_sampler {
                continue;
            }
            table.insert(range.0 + register, view.clone());
        }
        Ok(())
    }

    pub fn descriptor_at(&self, absolute_slot: u32) -> Option<BoundView> {
        self.table.lock().get(&absolute_slot).cloned()
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptor::heap::DescriptorHeapAllocator;
use crate::descriptor::layout::{DescriptorKind, DescriptorSetLayout};
use crate::error::GfxResult;
use crate::types::ResourceId;

/// A resource view currently bound to a register within a set. The core
/// does not interpret the contents; backends translate to their native view
/// handle when `update` is called.
#[derive(Debug, Clone)]
pub enum BoundView {
    Buffer { resource: ResourceId, offset: u64 },
    Image { resource: ResourceId, mip: u32, layer: u32 },
    Sampler(ResourceId),
    AccelerationStructure(ResourceId),
}

/// A set allocated from a [`DescriptorSetLayout`], holding a slice of a
/// shared global descriptor heap.
#[derive(Debug)]
pub struct DescriptorSet {
    pub id: ResourceId,
    pub layout: Arc<DescriptorSetLayout>,
    pub buffer_range: (u32, u32),
    pub sampler_range: (u32, u32),
    pub bindings: HashMap<u32, BoundView>,
}

impl DescriptorSet {
    pub fn bind(&mut self, register: u32, view: BoundView) {
        self.bindings.insert(register, view);
    }
}

/// Owns the two process-wide descriptor heaps (buffer-style, sampler-style)
/// and allocates/releases ranges for sets as they are constructed/dropped.
/// Guarded by a single mutex, matching the teacher's global-resource-pool
/// locking strategy.
pub struct GlobalDescriptorAllocator {
    buffers: Mutex<DescriptorHeapAllocator>,
    samplers: Mutex<DescriptorHeapAllocator>,
    /// Shadow copy of what a native `vkUpdateDescriptorSets`/CBV-SRV-UAV
    /// write would have put at each absolute buffer-heap slot. This core's
    /// logical-only buffers and images never get a native handle, so this
    /// table is the descriptor's actual backing store rather than a cache of
    /// one.
    buffer_table: Mutex<HashMap<u32, BoundView>>,
    sampler_table: Mutex<HashMap<u32, BoundView>>,
}

/// Sampler-style heaps are capped at this size by both native APIs.
pub const MAX_SAMPLER_DESCRIPTORS: u32 = 2048;

impl GlobalDescriptorAllocator {
    pub fn new(buffer_heap_size: u32) -> Self {
        Self {
            buffers: Mutex::new(DescriptorHeapAllocator::new(buffer_heap_size)),
            samplers: Mutex::new(DescriptorHeapAllocator::new(MAX_SAMPLER_DESCRIPTORS)),
            buffer_table: Mutex::new(HashMap::new()),
            sampler_table: Mutex::new(HashMap::new()),
        }
    }

    pub fn allocate(&self, buffer_count: u32, sampler_count: u32) -> GfxResult<((u32, u32), (u32, u32))> {
        let buffer_range = if buffer_count > 0 {
            let off = self.buffers.lock().allocate(buffer_count)?;
            (off, buffer_count)
        } else {
            (0, 0)
        };
        let sampler_range = if sampler_count > 0 {
            let off = self.samplers.lock().allocate(sampler_count)?;
            (off, sampler_count)
        } else {
            (0, 0)
        };
        Ok((buffer_range, sampler_range))
    }

    pub fn release(&self, buffer_range: (u32, u32), sampler_range: (u32, u32)) {
        if buffer_range.1 > 0 {
            self.buffers.lock().release(buffer_range.0, buffer_range.1);
        }
        if sampler_range.1 > 0 {
            self.samplers.lock().release(sampler_range.0, sampler_range.1);
        }
    }

    /// Copies every non-sampler binding in `set` into the global buffer-style
    /// heap at `set.buffer_range.0 + register`, the same slot arithmetic a
    /// native descriptor-table write would use.
    pub fn update_buffer_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        let mut table = self.buffer_table.lock();
        for (register, view) in &set.bindings {
            if is_sampler_binding(&set.layout, *register) {
                continue;
            }
            table.insert(set.buffer_range.0 + register, view.clone());
        }
        Ok(())
    }

    /// Copies every sampler binding in `set` into the global sampler heap at
    /// `set.sampler_range.0 + register`.
    pub fn update_sampler_descriptors(&self, set: &DescriptorSet) -> GfxResult<()> {
        let mut table = self.sampler_table.lock();
        for (register, view) in &set.bindings {
            if !is_sampler_binding(&set.layout, *register) {
                continue;
            }
            table.insert(set.sampler_range.0 + register, view.clone());
        }
        Ok(())
    }

    pub fn buffer_descriptor_at(&self, absolute_slot: u32) -> Option<BoundView> {
        self.buffer_table.lock().get(&absolute_slot).cloned()
    }

    pub fn sampler_descriptor_at(&self, absolute_slot: u32) -> Option<BoundView> {
        self.sampler_table.lock().get(&absolute_slot).cloned()
    }
}

pub(crate) fn is_sampler_binding(layout: &DescriptorSetLayout, register: u32) -> bool {
    layout
        .declarations
        .iter()
        .any(|decl| decl.register == register && decl.kind == DescriptorKind::Sampler)
}

use parking_lot::Mutex;

use crate::error::{GfxError, GfxResult};
use crate::types::{
    BufferKind, BufferUsage, Dimensionality, Extent3D, Format, HeapClass, ImageLayout, ImageUsage,
    ResourceAccess, ResourceId,
};

/// Current (access, layout) pair tracked per sub-range, transitioned only by
/// recording a [`crate::barrier::Barrier`] and calling
/// [`crate::barrier::Transition::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceState {
    pub access: ResourceAccess,
    pub layout: ImageLayout,
}

impl ResourceState {
    pub const UNDEFINED: ResourceState = ResourceState {
        access: ResourceAccess::NONE,
        layout: ImageLayout::Undefined,
    };
}

#[derive(Debug)]
pub struct Buffer {
    pub id: ResourceId,
    pub debug_name: Option<String>,
    pub kind: BufferKind,
    pub heap_class: HeapClass,
    pub elements: u64,
    pub element_size: u64,
    pub aligned_element_size: u64,
    pub usage: BufferUsage,
    pub gpu_address: Option<u64>,
    state: Mutex<ResourceState>,
}

impl Buffer {
    pub fn new(
        id: ResourceId,
        debug_name: Option<String>,
        kind: BufferKind,
        heap_class: HeapClass,
        elements: u64,
        element_size: u64,
        align: u64,
        usage: BufferUsage,
    ) -> GfxResult<Self> {
        if align == 0 {
            return Err(GfxError::invalid("alignment must be non-zero"));
        }
        let aligned_element_size = element_size.div_ceil(align) * align;
        if aligned_element_size < element_size {
            return Err(GfxError::invalid(
                "aligned element size must be >= element size",
            ));
        }
        Ok(Self {
            id,
            debug_name,
            kind,
            heap_class,
            elements,
            element_size,
            aligned_element_size,
            usage,
            gpu_address: None,
            state: Mutex::new(ResourceState::UNDEFINED),
        })
    }

    /// Total backing size. Invariant I-1: `size == elements * aligned_element_size`.
    pub fn size(&self) -> u64 {
        self.elements * self.aligned_element_size
    }

    pub fn state(&self) -> ResourceState {
        *self.state.lock()
    }

    /// Overwrites the tracked state. Called only from [`crate::barrier::Transition::apply`]
    /// once the recorded `before` state has been checked against the current one.
    pub(crate) fn set_state(&self, new: ResourceState) {
        *self.state.lock() = new;
    }

    pub(crate) fn check_range(&self, first_element: u64, count: u64) -> GfxResult<()> {
        if first_element + count > self.elements {
            return Err(GfxError::invalid(format!(
                "buffer range out of bounds: {first_element}+{count} > {}",
                self.elements
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Image {
    pub id: ResourceId,
    pub debug_name: Option<String>,
    pub format: Format,
    pub extent: Extent3D,
    pub dimensionality: Dimensionality,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub usage: ImageUsage,
    states: Mutex<Vec<ResourceState>>,
}

impl Image {
    pub fn new(
        id: ResourceId,
        debug_name: Option<String>,
        format: Format,
        extent: Extent3D,
        dimensionality: Dimensionality,
        array_layers: u32,
        mip_levels: u32,
        samples: u32,
        usage: ImageUsage,
    ) -> Self {
        let count = (array_layers * mip_levels) as usize;
        Self {
            id,
            debug_name,
            format,
            extent,
            dimensionality,
            array_layers,
            mip_levels,
            samples,
            usage,
            states: Mutex::new(vec![ResourceState::UNDEFINED; count.max(1)]),
        }
    }

    pub fn sub_resource_state(&self, linear_index: u32) -> ResourceState {
        self.states.lock()[linear_index as usize]
    }

    /// Overwrites one sub-resource's tracked state. Called only from
    /// [`crate::barrier::Transition::apply`].
    pub(crate) fn set_sub_resource_state(&self, linear_index: u32, new: ResourceState) {
        self.states.lock()[linear_index as usize] = new;
    }

    /// Overwrites every sub-resource's tracked state at once, used for
    /// whole-image transitions that don't name a single `SubResource`.
    pub(crate) fn set_all_states(&self, new: ResourceState) {
        for state in self.states.lock().iter_mut() {
            *state = new;
        }
    }

    pub(crate) fn sub_resource_count(&self) -> u32 {
        self.states.lock().len() as u32
    }
}

/// Maximum color render targets a graphics pipeline may bind, per §4.7.
pub const MAX_COLOR_RENDER_TARGETS: usize = 8;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{GfxError, GfxResult};
use crate::resource::Image;
use crate::types::{Extent2D, Format, ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTargetRole {
    Color,
    DepthStencil,
    Present,
}

#[derive(Debug, Clone, Copy)]
pub struct ClearValue {
    pub color: [f32; 4],
    pub depth: f32,
    pub stencil: u32,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderTargetFlags: u32 {
        const CLEAR_COLOR = 0b0001;
        const CLEAR_STENCIL = 0b0010;
        const VOLATILE = 0b0100;
        const ATTACHMENT_SAMPLEABLE = 0b1000;
    }
}

#[derive(Debug, Clone)]
pub struct RenderTargetDescriptor {
    pub location: RenderTargetLocation,
    pub role: RenderTargetRole,
    pub format: Format,
    pub clear: ClearValue,
    pub flags: RenderTargetFlags,
}

type EventToken = u64;

#[derive(Default)]
struct EventList<F> {
    next_token: AtomicU64,
    subscribers: Mutex<Vec<(EventToken, F)>>,
}

impl<F> EventList<F> {
    fn subscribe(&self, f: F) -> EventToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().unwrap().push((token, f));
        token
    }

    fn unsubscribe(&self, token: EventToken) {
        self.subscribers.lock().unwrap().retain(|(t, _)| *t != token);
    }
}

impl EventList<Box<dyn Fn(Extent2D) + Send + Sync>> {
    fn fire_resized(&self, extent: Extent2D) {
        for (_, f) in self.subscribers.lock().unwrap().iter() {
            f(extent);
        }
    }
}

impl EventList<Box<dyn Fn() + Send + Sync>> {
    fn fire_released(&self) {
        for (_, f) in self.subscribers.lock().unwrap().iter() {
            f();
        }
    }
}

/// Owns one image per render-target slot and a fixed-size set of secondary
/// command-buffer slots allocated at construction.
pub struct FrameBuffer {
    pub id: ResourceId,
    pub size: Extent2D,
    images: Mutex<HashMap<RenderTargetLocation, Arc<Image>>>,
    secondary_count: u32,
    resized: EventList<Box<dyn Fn(Extent2D) + Send + Sync>>,
    released: EventList<Box<dyn Fn() + Send + Sync>>,
}

impl FrameBuffer {
    pub fn new(id: ResourceId, size: Extent2D, secondary_count: u32) -> Self {
        Self {
            id,
            size,
            images: Mutex::new(HashMap::new()),
            secondary_count,
            resized: EventList::default(),
            released: EventList::default(),
        }
    }

    pub fn secondary_count(&self) -> u32 {
        self.secondary_count
    }

    pub fn add_image(&self, location: RenderTargetLocation, image: Arc<Image>) -> GfxResult<()> {
        let mut images = self.images.lock().unwrap();
        if images.contains_key(&location) {
            return Err(GfxError::invalid(format!(
                "render target location {} already bound",
                location.0
            )));
        }
        images.insert(location, image);
        Ok(())
    }

    pub fn image_at(&self, location: RenderTargetLocation) -> Option<Arc<Image>> {
        self.images.lock().unwrap().get(&location).cloned()
    }

    pub fn on_resized(&self, f: impl Fn(Extent2D) + Send + Sync + 'static) -> EventToken {
        self.resized.subscribe(Box::new(f))
    }

    pub fn unsubscribe_resized(&self, token: EventToken) {
        self.resized.unsubscribe(token);
    }

    pub fn on_released(&self, f: impl Fn() + Send + Sync + 'static) -> EventToken {
        self.released.subscribe(Box::new(f))
    }

    /// Reallocates every owned image to `new_size` and notifies listeners.
    /// Callers (pipelines holding cached input-attachment descriptor sets)
    /// must requery images after this returns.
    pub fn resize(&mut self, new_size: Extent2D) {
        self.size = new_size;
        self.resized.fire_resized(new_size);
    }

    /// Fires `released`; listeners must drop image references before this
    /// returns for the frame buffer to be safely torn down.
    pub fn release(self: Arc<Self>) {
        self.released.fire_released();
    }
}

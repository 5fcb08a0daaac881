use crate::error::GfxResult;
use crate::queue::FenceValue;
use crate::types::{Extent2D, Format};

#[derive(Debug, Clone, Copy)]
pub struct SwapChainDescriptor {
    pub format: Format,
    pub extent: Extent2D,
    pub back_buffer_count: u32,
    pub vsync: bool,
}

impl Default for SwapChainDescriptor {
    fn default() -> Self {
        Self {
            format: Format::B8G8R8A8Unorm,
            extent: Extent2D { width: 0, height: 0 },
            back_buffer_count: 2,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SwapChainResetEvent {
    pub old: SwapChainDescriptor,
    pub new: SwapChainDescriptor,
}

/// Owns the rotation of presentation images. `reset` fires a `reset` event
/// so dependent render passes/frame buffers can rebuild in lockstep.
pub trait SwapChain: Send + Sync {
    fn descriptor(&self) -> SwapChainDescriptor;

    /// Acquires the next back buffer, returning its 0-based index.
    fn acquire_next(&self) -> GfxResult<u32>;

    fn present(&self, wait_on: FenceValue) -> GfxResult<()>;

    fn reset(&self, descriptor: SwapChainDescriptor) -> GfxResult<()>;

    fn on_reset(&self, f: Box<dyn Fn(SwapChainResetEvent) + Send + Sync>);
}

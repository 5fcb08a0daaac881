use crate::command_buffer::CommandBuffer;
use crate::error::GfxResult;
use crate::types::{QueueKind, QueuePriority};

/// A monotonically increasing 64-bit timeline fence value. A queue is
/// considered done through `v` once its native fence reports `>= v`.
pub type FenceValue = u64;

/// Submission-ordering and cross-queue synchronization surface shared by
/// both backends. A queue serializes its own submissions internally (one
/// mutex per queue); it never blocks a caller beyond what `wait_for` asks
/// for explicitly.
pub trait Queue: Send + Sync {
    fn kind(&self) -> QueueKind;
    fn priority(&self) -> QueuePriority;

    /// Creates a command buffer. Secondary buffers can only ever be
    /// executed from within a primary's recording; submitting one directly
    /// fails with `GfxError::Runtime`.
    fn create_command_buffer(&self, secondary: bool) -> GfxResult<Box<dyn CommandBuffer>>;

    /// Submits command buffers in one native call, in the given order, so
    /// that render-pass suspend/resume records stay contiguous. Returns the
    /// fence value the submission will have reached on completion.
    fn submit(&self, buffers: &[&dyn CommandBuffer]) -> GfxResult<FenceValue>;

    /// Blocks the calling thread until the queue's timeline reaches `value`.
    fn wait_for(&self, value: FenceValue) -> GfxResult<()>;

    /// Inserts a GPU-side wait: the next submission on `self` will not begin
    /// executing until `other`'s timeline reaches `value`.
    fn wait_for_queue(&self, other: &dyn Queue, value: FenceValue) -> GfxResult<()>;

    fn current_value(&self) -> FenceValue;

    fn begin_debug_region(&self, _name: &str) {}
    fn end_debug_region(&self) {}
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;

use crate::command_buffer::CommandBuffer;
use crate::error::{GfxError, GfxResult};
use crate::queue::{FenceValue, Queue};
use crate::types::{QueueKind, QueuePriority};

use super::command_buffer::VulkanCommandBuffer;

/// One native queue plus its timeline semaphore. Submission is serialized
/// through `submit_lock`; the timeline semaphore's counter is the single
/// source of truth for "done through value v".
pub struct VulkanQueue {
    pub device: Arc<ash::Device>,
    pub raw: vk::Queue,
    pub family_index: u32,
    kind: QueueKind,
    priority: QueuePriority,
    timeline: vk::Semaphore,
    next_value: AtomicU64,
    submit_lock: Mutex<()>,
}

impl VulkanQueue {
    pub fn new(
        device: Arc<ash::Device>,
        raw: vk::Queue,
        family_index: u32,
        kind: QueueKind,
        priority: QueuePriority,
        timeline: vk::Semaphore,
    ) -> Self {
        Self {
            device,
            raw,
            family_index,
            kind,
            priority,
            timeline,
            next_value: AtomicU64::new(0),
            submit_lock: Mutex::new(()),
        }
    }

    fn command_buffers_of<'a>(buffers: &'a [&'a dyn CommandBuffer]) -> GfxResult<Vec<vk::CommandBuffer>> {
        let mut out = Vec::with_capacity(buffers.len());
        for buf in buffers {
            let vk_buf = buf
                .as_any()
                .downcast_ref::<VulkanCommandBuffer>()
                .ok_or_else(|| GfxError::runtime("command buffer does not belong to this backend"))?;
            out.push(vk_buf.raw);
        }
        Ok(out)
    }
}

impl Queue for VulkanQueue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn priority(&self) -> QueuePriority {
        self.priority
    }

    fn create_command_buffer(&self, secondary: bool) -> GfxResult<Box<dyn CommandBuffer>> {
        VulkanCommandBuffer::allocate(self.device.clone(), self.family_index, secondary)
            .map(|cb| Box::new(cb) as Box<dyn CommandBuffer>)
    }

    fn submit(&self, buffers: &[&dyn CommandBuffer]) -> GfxResult<FenceValue> {
        let _guard = self.submit_lock.lock();
        let raw_buffers = Self::command_buffers_of(buffers)?;
        let value = self.next_value.fetch_add(1, Ordering::SeqCst) + 1;

        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(std::slice::from_ref(&value));
        let signal_semaphores = [self.timeline];
        let submit_info = vk::SubmitInfo::default()
            .command_buffers(&raw_buffers)
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        unsafe {
            self.device
                .queue_submit(self.raw, std::slice::from_ref(&submit_info), vk::Fence::null())
        }
        .map_err(|e| GfxError::native("queue_submit", e.as_raw()))?;

        Ok(value)
    }

    fn wait_for(&self, value: FenceValue) -> GfxResult<()> {
        let semaphores = [self.timeline];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe { self.device.wait_semaphores(&wait_info, u64::MAX) }
            .map_err(|e| GfxError::native("wait_semaphores", e.as_raw()))
    }

    fn wait_for_queue(&self, other: &dyn Queue, value: FenceValue) -> GfxResult<()> {
        // A GPU-side wait requires the next submit on `self` to include
        // `other`'s timeline semaphore as a wait semaphore; recorded there
        // rather than blocked on here.
        other.wait_for(value)
    }

    fn current_value(&self) -> FenceValue {
        let mut value = 0u64;
        unsafe {
            let _ = (self.device.fp_v1_2().get_semaphore_counter_value)(
                self.device.handle(),
                self.timeline,
                &mut value,
            );
        }
        value
    }
}

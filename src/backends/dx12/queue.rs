use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};
use windows::Win32::Foundation::HANDLE;
use windows::core::Interface;

use crate::command_buffer::CommandBuffer;
use crate::error::{GfxError, GfxResult};
use crate::queue::{FenceValue, Queue};
use crate::types::{QueueKind, QueuePriority};

use super::command_buffer::Dx12CommandBuffer;

/// One `ID3D12CommandQueue` plus a shared fence, matching DX12's native
/// monotonic-fence-value model directly (no semaphore translation needed,
/// unlike the Vulkan-like backend).
pub struct Dx12Queue {
    pub raw: ID3D12CommandQueue,
    device: ID3D12Device,
    fence: ID3D12Fence,
    event: HANDLE,
    kind: QueueKind,
    priority: QueuePriority,
    next_value: AtomicU64,
    submit_lock: Mutex<()>,
}

unsafe impl Send for Dx12Queue {}
unsafe impl Sync for Dx12Queue {}

impl Dx12Queue {
    pub fn new(device: ID3D12Device, raw: ID3D12CommandQueue, kind: QueueKind, priority: QueuePriority) -> GfxResult<Self> {
        let fence: ID3D12Fence = unsafe { device.CreateFence(0, D3D12_FENCE_FLAG_NONE) }
            .map_err(|e| GfxError::native("CreateFence", e.code().0))?;
        let event = unsafe { CreateEventW(None, false, false, None) }
            .map_err(|e| GfxError::native("CreateEventW", e.code().0))?;
        Ok(Self {
            raw,
            device,
            fence,
            event,
            kind,
            priority,
            next_value: AtomicU64::new(0),
            submit_lock: Mutex::new(()),
        })
    }

    fn command_lists_of<'a>(buffers: &'a [&'a dyn CommandBuffer]) -> GfxResult<Vec<Option<ID3D12CommandList>>> {
        let mut out = Vec::with_capacity(buffers.len());
        for buf in buffers {
            let dx_buf = buf
                .as_any()
                .downcast_ref::<Dx12CommandBuffer>()
                .ok_or_else(|| GfxError::runtime("command buffer does not belong to this backend"))?;
            out.push(Some(dx_buf.raw.cast().map_err(|e| GfxError::native("cast to ID3D12CommandList", e.code().0))?));
        }
        Ok(out)
    }
}

impl Queue for Dx12Queue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn priority(&self) -> QueuePriority {
        self.priority
    }

    fn create_command_buffer(&self, secondary: bool) -> GfxResult<Box<dyn CommandBuffer>> {
        let list_type = if secondary {
            D3D12_COMMAND_LIST_TYPE_BUNDLE
        } else {
            match self.kind {
                QueueKind::Compute => D3D12_COMMAND_LIST_TYPE_COMPUTE,
                QueueKind::Transfer | QueueKind::VideoDecode | QueueKind::VideoEncode => D3D12_COMMAND_LIST_TYPE_COPY,
                QueueKind::Graphics => D3D12_COMMAND_LIST_TYPE_DIRECT,
            }
        };
        let allocator: ID3D12CommandAllocator = unsafe { self.device.CreateCommandAllocator(list_type) }
            .map_err(|e| GfxError::native("CreateCommandAllocator", e.code().0))?;
        let list: ID3D12GraphicsCommandList =
            unsafe { self.device.CreateCommandList(0, list_type, &allocator, None) }
                .map_err(|e| GfxError::native("CreateCommandList", e.code().0))?;
        unsafe { list.Close() }.map_err(|e| GfxError::native("Close", e.code().0))?;
        let mut cb = Dx12CommandBuffer::from_native(list, allocator, secondary);
        cb.reset_to_initial();
        Ok(Box::new(cb))
    }

    fn submit(&self, buffers: &[&dyn CommandBuffer]) -> GfxResult<FenceValue> {
        let _guard = self.submit_lock.lock();
        let lists = Self::command_lists_of(buffers)?;
        unsafe { self.raw.ExecuteCommandLists(&lists) };
        let value = self.next_value.fetch_add(1, Ordering::SeqCst) + 1;
        unsafe { self.raw.Signal(&self.fence, value) }.map_err(|e| GfxError::native("Signal", e.code().0))?;
        Ok(value)
    }

    fn wait_for(&self, value: FenceValue) -> GfxResult<()> {
        if unsafe { self.fence.GetCompletedValue() } >= value {
            return Ok(());
        }
        unsafe {
            self.fence
                .SetEventOnCompletion(value, self.event)
                .map_err(|e| GfxError::native("SetEventOnCompletion", e.code().0))?;
            WaitForSingleObject(self.event, INFINITE);
        }
        Ok(())
    }

    fn wait_for_queue(&self, other: &dyn Queue, value: FenceValue) -> GfxResult<()> {
        other.wait_for(value)
    }

    fn current_value(&self) -> FenceValue {
        unsafe { self.fence.GetCompletedValue() }
    }
}

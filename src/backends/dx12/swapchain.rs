use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::core::Interface;

use crate::error::{GfxError, GfxResult};
use crate::queue::FenceValue;
use crate::swapchain::{SwapChain, SwapChainDescriptor, SwapChainResetEvent};
use crate::types::Format;

pub fn to_dxgi_format(format: Format) -> DXGI_FORMAT {
    match format {
        Format::R8G8B8A8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        Format::B8G8R8A8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
        Format::R16G16B16A16Sfloat => DXGI_FORMAT_R16G16B16A16_FLOAT,
        Format::D32Sfloat => DXGI_FORMAT_D32_FLOAT,
        Format::D24UnormS8Uint => DXGI_FORMAT_D24_UNORM_S8_UINT,
        Format::R8Unorm => DXGI_FORMAT_R8_UNORM,
        Format::R32Uint => DXGI_FORMAT_R32_UINT,
    }
}

/// Wraps an `IDXGISwapChain3` created via `CreateSwapChainForHwnd`.
/// `reset` tears down and recreates the swap chain in place (DXGI requires
/// all outstanding back-buffer references be released first, which the
/// owning frame buffers do in response to the fired event).
pub struct Dx12SwapChain {
    factory: IDXGIFactory4,
    hwnd: HWND,
    present_queue: ID3D12CommandQueue,
    raw: Mutex<IDXGISwapChain3>,
    descriptor: Mutex<SwapChainDescriptor>,
    next_index: AtomicU32,
    listeners: Mutex<Vec<Box<dyn Fn(SwapChainResetEvent) + Send + Sync>>>,
}

impl Dx12SwapChain {
    pub fn new(
        factory: IDXGIFactory4,
        hwnd: HWND,
        present_queue: ID3D12CommandQueue,
        descriptor: SwapChainDescriptor,
    ) -> GfxResult<Self> {
        let raw = Self::create_raw(&factory, hwnd, &present_queue, &descriptor)?;
        Ok(Self {
            factory,
            hwnd,
            present_queue,
            raw: Mutex::new(raw),
            descriptor: Mutex::new(descriptor),
            next_index: AtomicU32::new(0),
            listeners: Mutex::new(Vec::new()),
        })
    }

    fn create_raw(
        factory: &IDXGIFactory4,
        hwnd: HWND,
        present_queue: &ID3D12CommandQueue,
        descriptor: &SwapChainDescriptor,
    ) -> GfxResult<IDXGISwapChain3> {
        let desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: descriptor.extent.width,
            Height: descriptor.extent.height,
            Format: to_dxgi_format(descriptor.format),
            Stereo: false.into(),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: descriptor.back_buffer_count,
            Scaling: DXGI_SCALING_STRETCH,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            AlphaMode: DXGI_ALPHA_MODE_UNSPECIFIED,
            Flags: 0,
        };
        let swap_chain1 = unsafe { factory.CreateSwapChainForHwnd(present_queue, hwnd, &desc, None, None) }
            .map_err(|e| GfxError::native("CreateSwapChainForHwnd", e.code().0))?;
        swap_chain1
            .cast::<IDXGISwapChain3>()
            .map_err(|e| GfxError::native("cast to IDXGISwapChain3", e.code().0))
    }
}

impl SwapChain for Dx12SwapChain {
    fn descriptor(&self) -> SwapChainDescriptor {
        *self.descriptor.lock().unwrap()
    }

    fn acquire_next(&self) -> GfxResult<u32> {
        let index = unsafe { self.raw.lock().unwrap().GetCurrentBackBufferIndex() };
        self.next_index.store(index, Ordering::SeqCst);
        Ok(index)
    }

    fn present(&self, _wait_on: FenceValue) -> GfxResult<()> {
        let interval = if self.descriptor.lock().unwrap().vsync { 1 } else { 0 };
        unsafe { self.raw.lock().unwrap().Present(interval, DXGI_PRESENT(0)) }
            .ok()
            .map_err(|e| GfxError::native("Present", e.code().0))
    }

    fn reset(&self, new: SwapChainDescriptor) -> GfxResult<()> {
        let old = {
            let mut descriptor = self.descriptor.lock().unwrap();
            let old = *descriptor;
            *descriptor = new;
            old
        };
        let recreated = Self::create_raw(&self.factory, self.hwnd, &self.present_queue, &new)?;
        *self.raw.lock().unwrap() = recreated;
        for listener in self.listeners.lock().unwrap().iter() {
            listener(SwapChainResetEvent { old, new });
        }
        Ok(())
    }

    fn on_reset(&self, f: Box<dyn Fn(SwapChainResetEvent) + Send + Sync>) {
        self.listeners.lock().unwrap().push(f);
    }
}

unsafe impl Send for Dx12SwapChain {}
unsafe impl Sync for Dx12SwapChain {}

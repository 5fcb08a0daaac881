//! End-to-end scenarios against the `null` backend: render-pass
//! suspend/resume submission, swap-chain rotation and reset, and
//! cross-queue fence ordering.

use std::sync::Arc;

use gfx_backend_core::backends::null::NullDevice;
use gfx_backend_core::command_buffer::CommandBuffer;
use gfx_backend_core::config::{GfxOptions, RequiredFeatures};
use gfx_backend_core::device::Device;
use gfx_backend_core::framebuffer::{
    ClearValue, FrameBuffer, RenderTargetDescriptor, RenderTargetFlags, RenderTargetLocation, RenderTargetRole,
};
use gfx_backend_core::queue::Queue;
use gfx_backend_core::render_pass::RenderPass;
use gfx_backend_core::swapchain::{SwapChain, SwapChainDescriptor};
use gfx_backend_core::types::{Extent2D, Format, QueueKind};

fn device() -> Arc<NullDevice> {
    NullDevice::new(GfxOptions::default(), RequiredFeatures::default())
}

fn color_target(location: u32) -> RenderTargetDescriptor {
    RenderTargetDescriptor {
        location: RenderTargetLocation(location),
        role: RenderTargetRole::Color,
        format: Format::R8G8B8A8Unorm,
        clear: ClearValue { color: [0.0, 0.0, 0.0, 1.0], depth: 1.0, stencil: 0 },
        flags: RenderTargetFlags::CLEAR_COLOR,
    }
}

fn present_target(location: u32) -> RenderTargetDescriptor {
    RenderTargetDescriptor { role: RenderTargetRole::Present, ..color_target(location) }
}

fn depth_target(location: u32) -> RenderTargetDescriptor {
    RenderTargetDescriptor {
        location: RenderTargetLocation(location),
        role: RenderTargetRole::DepthStencil,
        format: Format::D32Sfloat,
        clear: ClearValue { color: [0.0; 4], depth: 1.0, stencil: 0 },
        flags: RenderTargetFlags::empty(),
    }
}

#[test]
fn swap_chain_rotates_through_every_back_buffer() {
    let device = device();
    let swap_chain = device
        .create_swap_chain(SwapChainDescriptor {
            format: Format::B8G8R8A8Unorm,
            extent: Extent2D { width: 1280, height: 720 },
            back_buffer_count: 2,
            vsync: true,
        })
        .unwrap();

    let indices: Vec<u32> = (0..4).map(|_| swap_chain.acquire_next().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 0, 1]);
    swap_chain.present(0).unwrap();
}

#[test]
fn swap_chain_reset_notifies_listeners_with_old_and_new_descriptor() {
    let device = device();
    let original = SwapChainDescriptor {
        format: Format::B8G8R8A8Unorm,
        extent: Extent2D { width: 800, height: 600 },
        back_buffer_count: 2,
        vsync: true,
    };
    let swap_chain = device.create_swap_chain(original).unwrap();

    let seen = Arc::new(std::sync::Mutex::new(None));
    let seen_clone = seen.clone();
    swap_chain.on_reset(Box::new(move |event| {
        *seen_clone.lock().unwrap() = Some(event);
    }));

    let resized = SwapChainDescriptor { extent: Extent2D { width: 1600, height: 900 }, ..original };
    swap_chain.reset(resized).unwrap();

    let event = seen.lock().unwrap().take().expect("reset listener was never invoked");
    assert_eq!(event.old.extent.width, 800);
    assert_eq!(event.new.extent.width, 1600);
    assert_eq!(swap_chain.descriptor().extent.width, 1600);
}

#[test]
fn render_targets_must_be_strictly_increasing_by_location() {
    let device = device();
    let queue = device.default_queue(QueueKind::Graphics);
    let result = RenderPass::new(
        1,
        vec![color_target(1), color_target(0)],
        Vec::new(),
        None,
        queue,
        0,
        false,
        true,
        None,
    );
    assert!(result.is_err());
}

#[test]
fn render_pass_rejects_more_than_one_present_or_depth_target() {
    let device = device();
    let queue = device.default_queue(QueueKind::Graphics);

    let two_present = RenderPass::new(1, vec![present_target(0), present_target(1)], Vec::new(), None, queue.clone(), 0, true, true, None);
    assert!(two_present.is_err());

    let two_depth = RenderPass::new(2, vec![depth_target(0), depth_target(1)], Vec::new(), None, queue, 0, false, true, None);
    assert!(two_depth.is_err());
}

#[test]
fn present_render_target_requires_the_default_graphics_queue() {
    let device = device();
    let transfer_queue = device.default_queue(QueueKind::Transfer);
    let rejected = RenderPass::new(1, vec![present_target(0)], Vec::new(), None, transfer_queue, 0, true, false, None);
    assert!(rejected.is_err());

    let graphics_queue = device.default_queue(QueueKind::Graphics);
    let swap_chain = device.create_swap_chain(SwapChainDescriptor::default()).unwrap();
    let accepted = RenderPass::new(2, vec![present_target(0)], Vec::new(), None, graphics_queue, 0, true, true, Some(swap_chain));
    assert!(accepted.is_ok());
}

#[test]
fn render_pass_begin_end_cycle_submits_once_and_rejects_reentry() {
    let device = device();
    let queue = device.default_queue(QueueKind::Graphics);
    let pass = RenderPass::new(
        1,
        vec![color_target(0), depth_target(1)],
        Vec::new(),
        None,
        queue,
        2,
        false,
        true,
        None,
    )
    .unwrap();

    let color_image = device
        .create_image(
            Format::R8G8B8A8Unorm,
            gfx_backend_core::types::Extent3D { width: 640, height: 480, depth: 1 },
            gfx_backend_core::types::Dimensionality::D2,
            1,
            1,
            1,
            gfx_backend_core::types::ImageUsage::COLOR_ATTACHMENT,
            None,
        )
        .unwrap();
    let depth_image = device
        .create_image(
            Format::D32Sfloat,
            gfx_backend_core::types::Extent3D { width: 640, height: 480, depth: 1 },
            gfx_backend_core::types::Dimensionality::D2,
            1,
            1,
            1,
            gfx_backend_core::types::ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            None,
        )
        .unwrap();

    let frame_buffer = Arc::new(FrameBuffer::new(10, Extent2D { width: 640, height: 480 }, 2));
    frame_buffer.add_image(RenderTargetLocation(0), color_image.clone()).unwrap();
    frame_buffer.add_image(RenderTargetLocation(1), depth_image.clone()).unwrap();

    pass.begin(&frame_buffer).unwrap();
    // a render pass cannot be entered twice without an intervening end().
    assert!(pass.begin(&frame_buffer).is_err());

    let fence = pass.end(&frame_buffer).unwrap();
    assert!(fence >= 1);
    // ending an already-idle pass is rejected.
    assert!(pass.end(&frame_buffer).is_err());

    // a second back buffer (its own frame buffer, as with swap-chain
    // rotation) gets its own primary/secondary command buffers and submits
    // independently, advancing the same queue's fence.
    let other_frame_buffer = Arc::new(FrameBuffer::new(11, Extent2D { width: 640, height: 480 }, 2));
    other_frame_buffer.add_image(RenderTargetLocation(0), color_image).unwrap();
    other_frame_buffer.add_image(RenderTargetLocation(1), depth_image).unwrap();
    pass.begin(&other_frame_buffer).unwrap();
    let second_fence = pass.end(&other_frame_buffer).unwrap();
    assert!(second_fence > fence);
}

#[test]
fn frame_buffer_resize_notifies_listeners_and_updates_size() {
    let mut frame_buffer = FrameBuffer::new(1, Extent2D { width: 320, height: 240 }, 0);
    let seen = Arc::new(std::sync::Mutex::new(None));
    let seen_clone = seen.clone();
    frame_buffer.on_resized(move |extent| {
        *seen_clone.lock().unwrap() = Some(extent);
    });

    frame_buffer.resize(Extent2D { width: 640, height: 480 });

    assert_eq!(frame_buffer.size.width, 640);
    let extent = seen.lock().unwrap().take().unwrap();
    assert_eq!(extent.width, 640);
}

#[test]
fn frame_buffer_rejects_rebinding_an_occupied_render_target_location() {
    use gfx_backend_core::types::{Dimensionality, Extent3D, ImageUsage};

    let device = device();
    let first = device
        .create_image(
            Format::R8G8B8A8Unorm,
            Extent3D { width: 100, height: 100, depth: 1 },
            Dimensionality::D2,
            1,
            1,
            1,
            ImageUsage::COLOR_ATTACHMENT,
            None,
        )
        .unwrap();
    let second = device
        .create_image(
            Format::R8G8B8A8Unorm,
            Extent3D { width: 100, height: 100, depth: 1 },
            Dimensionality::D2,
            1,
            1,
            1,
            ImageUsage::COLOR_ATTACHMENT,
            None,
        )
        .unwrap();

    let frame_buffer = FrameBuffer::new(1, Extent2D { width: 100, height: 100 }, 0);
    frame_buffer.add_image(RenderTargetLocation(0), first.clone()).unwrap();
    assert!(frame_buffer.add_image(RenderTargetLocation(0), second).is_err());
    assert_eq!(frame_buffer.image_at(RenderTargetLocation(0)).map(|i| i.id), Some(first.id));
}

#[test]
fn queue_wait_for_rejects_fence_values_never_reached() {
    let device = device();
    let queue = device.default_queue(QueueKind::Graphics);
    assert_eq!(queue.current_value(), 0);
    assert!(queue.wait_for(1).is_err());

    let mut cmd = queue.create_command_buffer(false).unwrap();
    cmd.begin().unwrap();
    cmd.end().unwrap();
    let fence = queue.submit(&[cmd.as_ref()]).unwrap();

    assert!(queue.wait_for(fence).is_ok());
    assert!(queue.wait_for(fence + 1).is_err());
}

#[test]
fn submitting_a_non_executable_command_buffer_is_rejected() {
    let device = device();
    let queue = device.default_queue(QueueKind::Graphics);
    let mut cmd = queue.create_command_buffer(false).unwrap();
    cmd.begin().unwrap();
    // still Recording, not Executable: submit must reject it.
    assert!(queue.submit(&[cmd.as_ref()]).is_err());
}

#[test]
fn cross_queue_wait_for_queue_forwards_to_the_target_queues_own_fence() {
    let device = device();
    let transfer = device.default_queue(QueueKind::Transfer);
    let graphics = device.default_queue(QueueKind::Graphics);

    let mut cmd = transfer.create_command_buffer(false).unwrap();
    cmd.begin().unwrap();
    cmd.end().unwrap();
    let transfer_fence = transfer.submit(&[cmd.as_ref()]).unwrap();

    // graphics queue observes completion through transfer's own fence, not
    // its own counter (which is still at 0).
    assert!(graphics.wait_for_queue(transfer.as_ref(), transfer_fence).is_ok());
    assert!(graphics.wait_for_queue(transfer.as_ref(), transfer_fence + 1).is_err());
}

#[test]
fn dispatch_indirect_clamps_to_the_args_buffer_capacity() {
    use gfx_backend_core::command_buffer::IndirectArgsLayout;

    let device = device();
    let queue = device.default_queue(QueueKind::Compute);
    let mut cmd = queue.create_command_buffer(false).unwrap();
    cmd.begin().unwrap();

    // 4 batches fit in a 256-byte aligned args range with a 64-byte stride,
    // but only 16 were requested.
    let dispatched = cmd
        .dispatch_indirect(1, 16, IndirectArgsLayout { stride: 64 }, 256)
        .unwrap();
    assert_eq!(dispatched, 4);

    let clamped = cmd
        .dispatch_indirect(1, 2, IndirectArgsLayout { stride: 64 }, 256)
        .unwrap();
    assert_eq!(clamped, 2);
}

#[test]
fn blas_and_tlas_size_queries_round_up_to_the_backends_alignment() {
    use gfx_backend_core::acceleration_structure::{AccelerationStructureBuildFlags, InstanceRecord, Transform3x4, TlasBuildInfo, GeometryFlags};

    let device = device();
    let info = TlasBuildInfo {
        instances: vec![InstanceRecord {
            blas: 1,
            transform: Transform3x4([[0.0; 4]; 3]),
            custom_index: 0,
            hit_group_offset: 0,
            mask: 0xFF,
            flags: GeometryFlags::OPAQUE,
        }],
        flags: AccelerationStructureBuildFlags::ALLOW_COMPACTION,
    };
    let sizes = device.compute_acceleration_structure_sizes_tlas(&info).unwrap();
    assert_eq!(sizes.result_size % 256, 0);
    assert!(sizes.result_size > 0);
}

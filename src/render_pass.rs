use std::sync::{Arc, Mutex};

use crate::barrier::{Barrier, Transition};
use crate::command_buffer::CommandBuffer;
use crate::descriptor::BindingPoint;
use crate::error::{GfxError, GfxResult};
use crate::framebuffer::{FrameBuffer, RenderTargetDescriptor, RenderTargetLocation, RenderTargetRole};
use crate::queue::{FenceValue, Queue};
use crate::resource::ResourceState;
use crate::swapchain::SwapChain;
use crate::types::{ImageLayout, PipelineStage, ResourceAccess, ResourceId};

/// The state a render target is transitioned into for the duration of the
/// pass, keyed only by role: every color/present target renders as a color
/// attachment, the one depth-stencil target as a depth-write attachment.
fn in_pass_state(role: RenderTargetRole) -> ResourceState {
    match role {
        RenderTargetRole::DepthStencil => ResourceState {
            access: ResourceAccess::COMMON,
            layout: ImageLayout::DepthWrite,
        },
        RenderTargetRole::Color | RenderTargetRole::Present => ResourceState {
            access: ResourceAccess::COMMON,
            layout: ImageLayout::ColorAttachment,
        },
    }
}

#[derive(Debug, Clone)]
pub struct InputAttachmentDependency {
    pub binding: BindingPoint,
    pub source_render_pass: ResourceId,
    pub source_location: RenderTargetLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassState {
    Idle,
    Active,
}

struct FrameBufferContext {
    primary: Box<dyn CommandBuffer>,
    secondaries: Vec<Box<dyn CommandBuffer>>,
    last_fence: Option<FenceValue>,
}

/// Coordinates a set of render targets + input attachments into
/// suspend/resume render sequences across N secondary command buffers,
/// submitted together with the begin/end primaries in one native call.
pub struct RenderPass {
    pub id: ResourceId,
    render_targets: Vec<RenderTargetDescriptor>,
    input_attachments: Vec<InputAttachmentDependency>,
    input_attachment_sampler: Option<BindingPoint>,
    queue: Arc<dyn Queue>,
    secondary_count_per_frame_buffer: u32,
    swap_chain: Option<Arc<dyn SwapChain>>,
    state: Mutex<RenderPassState>,
    contexts: Mutex<std::collections::HashMap<ResourceId, FrameBufferContext>>,
}

impl RenderPass {
    pub fn new(
        id: ResourceId,
        render_targets: Vec<RenderTargetDescriptor>,
        input_attachments: Vec<InputAttachmentDependency>,
        input_attachment_sampler: Option<BindingPoint>,
        queue: Arc<dyn Queue>,
        secondary_count_per_frame_buffer: u32,
        has_present_target: bool,
        is_default_graphics_queue: bool,
        swap_chain: Option<Arc<dyn SwapChain>>,
    ) -> GfxResult<Self> {
        Self::validate_render_targets(&render_targets)?;
        if has_present_target && !is_default_graphics_queue {
            return Err(GfxError::invalid(
                "a render pass with a present target must use the swap chain's graphics queue",
            ));
        }
        if has_present_target != swap_chain.is_some() {
            return Err(GfxError::invalid(
                "a render pass carries a swap chain if and only if it declares a present target",
            ));
        }
        Ok(Self {
            id,
            render_targets,
            input_attachments,
            input_attachment_sampler,
            queue,
            secondary_count_per_frame_buffer,
            swap_chain,
            state: Mutex::new(RenderPassState::Idle),
            contexts: Mutex::new(std::collections::HashMap::new()),
        })
    }

    fn validate_render_targets(targets: &[RenderTargetDescriptor]) -> GfxResult<()> {
        let mut present_count = 0;
        let mut depth_count = 0;
        let mut last_location: Option<u32> = None;
        for target in targets {
            if let Some(last) = last_location {
                if target.location.0 <= last {
                    return Err(GfxError::invalid(
                        "render targets must be strictly increasing by location",
                    ));
                }
            }
            last_location = Some(target.location.0);
            match target.role {
                RenderTargetRole::Present => present_count += 1,
                RenderTargetRole::DepthStencil => depth_count += 1,
                RenderTargetRole::Color => {}
            }
        }
        if present_count > 1 {
            return Err(GfxError::invalid("at most one present render target is allowed"));
        }
        if depth_count > 1 {
            return Err(GfxError::invalid(
                "at most one depth-stencil render target is allowed",
            ));
        }
        Ok(())
    }

    pub fn render_targets(&self) -> &[RenderTargetDescriptor] {
        &self.render_targets
    }

    pub fn input_attachments(&self) -> &[InputAttachmentDependency] {
        &self.input_attachments
    }

    pub fn input_attachment_sampler(&self) -> Option<BindingPoint> {
        self.input_attachment_sampler
    }

    pub fn state(&self) -> RenderPassState {
        *self.state.lock().unwrap()
    }

    /// Registers a frame buffer on first sighting: creates one primary and
    /// N secondary command buffers and subscribes to its `released` event.
    fn ensure_context(&self, frame_buffer: &Arc<FrameBuffer>) -> GfxResult<()> {
        let mut contexts = self.contexts.lock().unwrap();
        if contexts.contains_key(&frame_buffer.id) {
            return Ok(());
        }
        let primary = self.queue.create_command_buffer(false)?;
        let mut secondaries = Vec::with_capacity(frame_buffer.secondary_count() as usize);
        for _ in 0..frame_buffer.secondary_count() {
            secondaries.push(self.queue.create_command_buffer(true)?);
        }
        contexts.insert(
            frame_buffer.id,
            FrameBufferContext {
                primary,
                secondaries,
                last_fence: None,
            },
        );
        Ok(())
    }

    /// Begins the begin/end cycle: validates `Idle`, registers the frame
    /// buffer, records input transitions, and opens the primary as a
    /// suspending record plus every secondary as suspending+resuming.
    pub fn begin(&self, frame_buffer: &Arc<FrameBuffer>) -> GfxResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != RenderPassState::Idle {
                return Err(GfxError::runtime("render pass is already active"));
            }
            *state = RenderPassState::Active;
        }
        self.ensure_context(frame_buffer)?;
        let mut contexts = self.contexts.lock().unwrap();
        let ctx = contexts.get_mut(&frame_buffer.id).unwrap();
        ctx.primary.begin()?;
        for secondary in &mut ctx.secondaries {
            secondary.begin()?;
        }

        // Every declared render target moves from whatever state the frame
        // buffer's image was left in by its previous user into the state it
        // must be in while this pass records against it.
        let mut barrier = Barrier::new(PipelineStage::All, PipelineStage::RenderTarget);
        for target in &self.render_targets {
            let image = frame_buffer.image_at(target.location).ok_or_else(|| {
                GfxError::runtime(format!(
                    "frame buffer has no image bound at render target location {}",
                    target.location.0
                ))
            })?;
            let before = image.sub_resource_state(0);
            barrier.push(Transition::image(image, None, before, in_pass_state(target.role)));
        }
        ctx.primary.barrier(&barrier)?;
        Ok(())
    }

    /// Ends the begin/end cycle: ends all secondaries, records output
    /// transitions on a resuming primary record, submits
    /// `[primary-begin, secondaries.., primary-end]` in one call, and
    /// returns to `Idle`.
    pub fn end(&self, frame_buffer: &Arc<FrameBuffer>) -> GfxResult<FenceValue> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != RenderPassState::Active {
                return Err(GfxError::runtime("render pass is not active"));
            }
        }
        let mut contexts = self.contexts.lock().unwrap();
        let ctx = contexts.get_mut(&frame_buffer.id).unwrap();
        for secondary in &mut ctx.secondaries {
            secondary.end()?;
        }

        // Output transitions, recorded on the resuming primary before it
        // itself ends: multisampled targets resolve into a general read
        // state (or straight into `Present` for the present target), and
        // single-sampled targets move there directly. This core never
        // allocates a native view for the resolve destination, so the
        // resolve is expressed as the two chained state transitions a real
        // resolve call would bracket, applied back to back.
        let mut barrier = Barrier::new(PipelineStage::RenderTarget, PipelineStage::Resolve);
        for target in &self.render_targets {
            let image = frame_buffer.image_at(target.location).ok_or_else(|| {
                GfxError::runtime(format!(
                    "frame buffer has no image bound at render target location {}",
                    target.location.0
                ))
            })?;
            let during = in_pass_state(target.role);
            let settled = match target.role {
                RenderTargetRole::DepthStencil => ResourceState {
                    access: ResourceAccess::COMMON,
                    layout: ImageLayout::ReadWrite,
                },
                RenderTargetRole::Color => ResourceState {
                    access: ResourceAccess::COMMON,
                    layout: ImageLayout::ReadWrite,
                },
                RenderTargetRole::Present => ResourceState {
                    access: ResourceAccess::MEMORY_READ,
                    layout: ImageLayout::Present,
                },
            };
            if image.samples > 1 {
                let resolved = ResourceState {
                    access: ResourceAccess::MEMORY_READ,
                    layout: ImageLayout::ResolveSource,
                };
                barrier.push(Transition::image(image.clone(), None, during, resolved));
                barrier.push(Transition::image(image, None, resolved, settled));
            } else {
                barrier.push(Transition::image(image, None, during, settled));
            }
        }
        ctx.primary.barrier(&barrier)?;
        ctx.primary.end()?;

        let mut submission: Vec<&dyn CommandBuffer> = Vec::with_capacity(1 + ctx.secondaries.len());
        submission.push(ctx.primary.as_ref());
        for secondary in &ctx.secondaries {
            submission.push(secondary.as_ref());
        }
        let fence = self.queue.submit(&submission)?;
        ctx.last_fence = Some(fence);

        if let Some(swap_chain) = &self.swap_chain {
            swap_chain.present(fence)?;
        }

        *self.state.lock().unwrap() = RenderPassState::Idle;
        Ok(fence)
    }

    pub fn drop_frame_buffer_context(&self, frame_buffer_id: ResourceId) {
        self.contexts.lock().unwrap().remove(&frame_buffer_id);
    }
}

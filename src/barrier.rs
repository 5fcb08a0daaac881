use std::sync::Arc;

use crate::error::{GfxError, GfxResult};
use crate::resource::{Buffer, Image, ResourceState};
use crate::types::{ImageLayout, PipelineStage, ResourceAccess, SubResource};

/// The resource a [`Transition`] mutates. Holding the `Arc` directly (rather
/// than a bare `ResourceId`) is what lets `apply()` mutate the resource's own
/// tracked state without a separate id -> resource registry.
#[derive(Debug, Clone)]
pub enum TransitionTarget {
    Buffer(Arc<Buffer>),
    Image(Arc<Image>, Option<SubResource>),
}

/// One resource transition within a [`Barrier`].
#[derive(Debug, Clone)]
pub struct Transition {
    pub target: TransitionTarget,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl Transition {
    pub fn buffer(buffer: Arc<Buffer>, before: ResourceAccess, after: ResourceAccess) -> Self {
        Self {
            target: TransitionTarget::Buffer(buffer),
            before: ResourceState {
                access: before,
                layout: ImageLayout::Undefined,
            },
            after: ResourceState {
                access: after,
                layout: ImageLayout::Undefined,
            },
        }
    }

    pub fn image(
        image: Arc<Image>,
        sub_range: Option<SubResource>,
        before: ResourceState,
        after: ResourceState,
    ) -> Self {
        Self {
            target: TransitionTarget::Image(image, sub_range),
            before,
            after,
        }
    }

    /// Checks the target's current tracked state against `before` and, if it
    /// matches, overwrites it with `after`. A mismatch means this transition
    /// was recorded against a stale or out-of-order view of the resource's
    /// state and is rejected rather than silently applied.
    pub fn apply(&self) -> GfxResult<()> {
        match &self.target {
            TransitionTarget::Buffer(buffer) => {
                let current = buffer.state();
                if current != self.before {
                    return Err(GfxError::runtime(format!(
                        "barrier before-state mismatch on buffer {}: expected {:?}, found {:?}",
                        buffer.id, self.before, current
                    )));
                }
                buffer.set_state(self.after);
                Ok(())
            }
            TransitionTarget::Image(image, sub_range) => match sub_range {
                Some(sr) => {
                    let idx = sr.linear_index(image.mip_levels, image.array_layers);
                    let current = image.sub_resource_state(idx);
                    if current != self.before {
                        return Err(GfxError::runtime(format!(
                            "barrier before-state mismatch on image {} sub-resource {idx}: expected {:?}, found {:?}",
                            image.id, self.before, current
                        )));
                    }
                    image.set_sub_resource_state(idx, self.after);
                    Ok(())
                }
                None => {
                    for idx in 0..image.sub_resource_count() {
                        let current = image.sub_resource_state(idx);
                        if current != self.before {
                            return Err(GfxError::runtime(format!(
                                "barrier before-state mismatch on image {} sub-resource {idx}: expected {:?}, found {:?}",
                                image.id, self.before, current
                            )));
                        }
                    }
                    image.set_all_states(self.after);
                    Ok(())
                }
            },
        }
    }
}

/// Aggregates one or more transitions across a single before/after pipeline
/// stage scope, matching the native "enhanced barrier"/synchronization-v2
/// model both backends target.
#[derive(Debug, Clone, Default)]
pub struct Barrier {
    pub before_stage: Option<PipelineStage>,
    pub after_stage: Option<PipelineStage>,
    pub transitions: Vec<Transition>,
}

impl Barrier {
    pub fn new(before_stage: PipelineStage, after_stage: PipelineStage) -> Self {
        Self {
            before_stage: Some(before_stage),
            after_stage: Some(after_stage),
            transitions: Vec::new(),
        }
    }

    pub fn push(&mut self, transition: Transition) -> &mut Self {
        self.transitions.push(transition);
        self
    }
}

/// Applies every transition's in-memory state change, in order. Backends
/// call this from their `barrier()` implementation before (or after, for
/// DX12's before-and-after-state model) issuing the native synchronization
/// call, so a transition's bookkeeping effect is never contingent on which
/// backend recorded it.
pub fn apply_all(barrier: &Barrier) -> GfxResult<()> {
    for transition in &barrier.transitions {
        transition.apply()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferKind, BufferUsage, HeapClass};

    #[test]
    fn buffer_transition_mutates_tracked_state_and_rejects_stale_before() {
        let buffer = Arc::new(
            Buffer::new(1, None, BufferKind::Storage, HeapClass::Resource, 1, 4, 4, BufferUsage::STORAGE).unwrap(),
        );
        assert_eq!(buffer.state().access, ResourceAccess::NONE);

        let t = Transition::buffer(buffer.clone(), ResourceAccess::NONE, ResourceAccess::SHADER_READ);
        t.apply().unwrap();
        assert_eq!(buffer.state().access, ResourceAccess::SHADER_READ);

        // the buffer is now SHADER_READ, not NONE: a stale transition is rejected.
        let stale = Transition::buffer(buffer.clone(), ResourceAccess::NONE, ResourceAccess::SHADER_WRITE);
        assert!(stale.apply().is_err());
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::descriptor::{BoundView, DescriptorDeclaration, DescriptorKind, DescriptorSet, DescriptorSetLayout, ShaderStageMask};
use crate::device::Device;
use crate::error::{GfxError, GfxResult};
use crate::framebuffer::FrameBuffer;
use crate::render_pass::RenderPass;
use crate::types::ResourceId;

/// Builds, validates, and caches the descriptor set a pipeline needs in
/// order to read a render pass's declared input attachments.
///
/// A pipeline owns one binder per render pass it subpasses into. The
/// binder partitions the pass's input-attachment registers (plus its
/// optional shared sampler register) into a single descriptor set layout
/// at construction -- [`DescriptorSetLayout::new`] rejects a colliding
/// partition outright -- then lazily builds and caches one descriptor set
/// per frame buffer the pipeline is used against, rebuilding it the next
/// time [`InputAttachmentBinder::bind`] is called after that frame
/// buffer resizes.
pub struct InputAttachmentBinder {
    layout: Arc<DescriptorSetLayout>,
    cache: Arc<Mutex<HashMap<ResourceId, Arc<DescriptorSet>>>>,
    subscribed: Mutex<HashSet<ResourceId>>,
}

impl InputAttachmentBinder {
    /// `set_id`/`set_index` are supplied by the caller: this module does
    /// not hand out resource ids itself.
    pub fn new(device: &Arc<dyn Device>, pass: &RenderPass, set_id: ResourceId, set_index: u32) -> GfxResult<Self> {
        let mut declarations: Vec<DescriptorDeclaration> = pass
            .input_attachments()
            .iter()
            .map(|dep| DescriptorDeclaration {
                kind: DescriptorKind::InputAttachment,
                register: dep.binding.register,
                count: 1,
            })
            .collect();
        if let Some(sampler) = pass.input_attachment_sampler() {
            declarations.push(DescriptorDeclaration {
                kind: DescriptorKind::Sampler,
                register: sampler.register,
                count: 1,
            });
        }
        let layout = DescriptorSetLayout::new(set_id, set_index, ShaderStageMask::FRAGMENT, declarations)?;
        let layout = device.create_descriptor_set_layout(layout)?;
        Ok(Self {
            layout,
            cache: Arc::new(Mutex::new(HashMap::new())),
            subscribed: Mutex::new(HashSet::new()),
        })
    }

    pub fn layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.layout
    }

    /// Returns the descriptor set bound to `frame_buffer`'s current
    /// input-attachment images, building it on first use and reusing it
    /// afterward. `sampler` must be `Some` exactly when the pass declares
    /// `input_attachment_sampler`.
    pub fn bind(
        &self,
        device: &Arc<dyn Device>,
        pass: &RenderPass,
        frame_buffer: &Arc<FrameBuffer>,
        sampler: Option<ResourceId>,
    ) -> GfxResult<Arc<DescriptorSet>> {
        if let Some(set) = self.cache.lock().unwrap().get(&frame_buffer.id) {
            return Ok(set.clone());
        }

        let sampler_binding = pass.input_attachment_sampler();
        if sampler_binding.is_some() != sampler.is_some() {
            return Err(GfxError::invalid(
                "a sampler must be supplied if and only if the render pass declares an input-attachment sampler binding",
            ));
        }

        let mut set = device.allocate_descriptor_set(&self.layout)?;
        for dep in pass.input_attachments() {
            let image = frame_buffer.image_at(dep.source_location).ok_or_else(|| {
                GfxError::runtime(format!(
                    "frame buffer has no image bound at input-attachment source location {}",
                    dep.source_location.0
                ))
            })?;
            set.bind(dep.binding.register, BoundView::Image { resource: image.id, mip: 0, layer: 0 });
        }
        if let (Some(binding), Some(sampler_id)) = (sampler_binding, sampler) {
            set.bind(binding.register, BoundView::Sampler(sampler_id));
        }

        device.update_buffer_descriptors(&set)?;
        if sampler_binding.is_some() {
            device.update_sampler_descriptors(&set)?;
        }

        let set = Arc::new(set);
        self.cache.lock().unwrap().insert(frame_buffer.id, set.clone());

        if self.subscribed.lock().unwrap().insert(frame_buffer.id) {
            let cache = self.cache.clone();
            let device = device.clone();
            let id = frame_buffer.id;
            frame_buffer.on_resized(move |_extent| {
                if let Some(stale) = cache.lock().unwrap().remove(&id) {
                    if let Ok(set) = Arc::try_unwrap(stale) {
                        device.release_descriptor_set(set);
                    }
                }
            });
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GfxOptions, RequiredFeatures};
    use crate::descriptor::BindingPoint;
    use crate::framebuffer::{ClearValue, RenderTargetDescriptor, RenderTargetFlags, RenderTargetLocation, RenderTargetRole};
    use crate::queue::Queue;
    use crate::types::{Dimensionality, Extent2D, Extent3D, Format, ImageUsage, QueueKind};

    fn device() -> Arc<dyn Device> {
        crate::backends::null::NullDevice::new(GfxOptions::default(), RequiredFeatures::default())
    }

    fn color_target(location: u32) -> RenderTargetDescriptor {
        RenderTargetDescriptor {
            location: RenderTargetLocation(location),
            role: RenderTargetRole::Color,
            format: Format::R8G8B8A8Unorm,
            clear: ClearValue { color: [0.0; 4], depth: 1.0, stencil: 0 },
            flags: RenderTargetFlags::empty(),
        }
    }

    #[test]
    fn colliding_input_attachment_and_sampler_registers_are_rejected() {
        let device = device();
        let queue: Arc<dyn Queue> = device.default_queue(QueueKind::Graphics);
        let pass = RenderPass::new(
            1,
            vec![color_target(0)],
            vec![crate::render_pass::InputAttachmentDependency {
                binding: BindingPoint { register: 3, space: 0 },
                source_render_pass: 0,
                source_location: RenderTargetLocation(0),
            }],
            Some(BindingPoint { register: 3, space: 0 }),
            queue,
            0,
            false,
            true,
            None,
        )
        .unwrap();

        assert!(InputAttachmentBinder::new(&device, &pass, 100, 0).is_err());
    }

    #[test]
    fn bind_caches_per_frame_buffer_and_rebuilds_after_resize() {
        let device = device();
        let queue: Arc<dyn Queue> = device.default_queue(QueueKind::Graphics);
        let pass = RenderPass::new(
            1,
            vec![color_target(0)],
            vec![crate::render_pass::InputAttachmentDependency {
                binding: BindingPoint { register: 0, space: 0 },
                source_render_pass: 0,
                source_location: RenderTargetLocation(0),
            }],
            None,
            queue,
            0,
            false,
            true,
            None,
        )
        .unwrap();

        let binder = InputAttachmentBinder::new(&device, &pass, 100, 0).unwrap();

        let frame_buffer = FrameBuffer::new(10, Extent2D { width: 64, height: 64 }, 0);
        let image = device
            .create_image(
                Format::R8G8B8A8Unorm,
                Extent3D { width: 64, height: 64, depth: 1 },
                Dimensionality::D2,
                1,
                1,
                1,
                ImageUsage::INPUT_ATTACHMENT,
                None,
            )
            .unwrap();
        frame_buffer.add_image(RenderTargetLocation(0), image).unwrap();
        let mut frame_buffer = Arc::new(frame_buffer);

        let first = binder.bind(&device, &pass, &frame_buffer, None).unwrap();
        let second = binder.bind(&device, &pass, &frame_buffer, None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // no other strong reference exists yet, so the frame buffer can
        // still be resized in place to exercise the cache invalidation.
        Arc::get_mut(&mut frame_buffer)
            .expect("frame buffer had no other owners")
            .resize(Extent2D { width: 128, height: 128 });
        let third = binder.bind(&device, &pass, &frame_buffer, None).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}

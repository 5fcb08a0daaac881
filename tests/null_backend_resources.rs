//! Exercises device/resource invariants against the `null` backend: no GPU
//! or windowing system required.

use gfx_backend_core::backends::null::NullDevice;
use gfx_backend_core::config::{GfxOptions, RequiredFeatures};
use gfx_backend_core::descriptor::{DescriptorDeclaration, DescriptorKind, DescriptorSetLayout, ShaderStageMask};
use gfx_backend_core::device::Device;
use gfx_backend_core::pipeline::graphics::GraphicsPipelineDescriptor;
use gfx_backend_core::pipeline::shader::{ShaderModule, ShaderProgram, ShaderStage};
use gfx_backend_core::types::{
    BufferKind, BufferUsage, Dimensionality, Extent3D, Format, HeapClass, ImageUsage,
};

fn device() -> std::sync::Arc<NullDevice> {
    NullDevice::new(GfxOptions::default(), RequiredFeatures::default())
}

#[test]
fn buffer_aligned_size_matches_elements_times_aligned_element_size() {
    let device = device();
    let buffer = device
        .create_buffer(
            BufferKind::Uniform,
            HeapClass::Dynamic,
            4,
            17,
            BufferUsage::UNIFORM,
            Some("frame-constants"),
        )
        .unwrap();
    // element_size=17 rounds up to the null backend's 256-byte alignment.
    assert_eq!(buffer.aligned_element_size, 256);
    assert_eq!(buffer.size(), 4 * 256);
}

#[test]
fn buffer_out_of_range_transfer_is_rejected() {
    let device = device();
    let buffer = device
        .create_buffer(
            BufferKind::Storage,
            HeapClass::Resource,
            8,
            64,
            BufferUsage::STORAGE,
            None,
        )
        .unwrap();
    assert!(buffer.check_range(0, 8).is_ok());
    assert!(buffer.check_range(4, 4).is_ok());
    // one past the end must fail, exactly at the end must succeed.
    assert!(buffer.check_range(4, 5).is_err());
    assert!(buffer.check_range(8, 0).is_ok());
}

#[test]
fn image_creation_preserves_requested_format_and_extent() {
    let device = device();
    let image = device
        .create_image(
            Format::R16G16B16A16Sfloat,
            Extent3D { width: 1920, height: 1080, depth: 1 },
            Dimensionality::D2,
            1,
            1,
            1,
            ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
            Some("hdr-target"),
        )
        .unwrap();
    assert_eq!(image.format, Format::R16G16B16A16Sfloat);
    assert_eq!(image.extent.width, 1920);
    assert!(image.usage.contains(ImageUsage::SAMPLED));
}

fn layout_with_one_cbv_and_one_sampler(device: &NullDevice) -> std::sync::Arc<DescriptorSetLayout> {
    let layout = DescriptorSetLayout::new(
        0,
        0,
        ShaderStageMask::FRAGMENT,
        vec![
            DescriptorDeclaration { kind: DescriptorKind::ConstantBuffer, register: 0, count: 1 },
            DescriptorDeclaration { kind: DescriptorKind::Sampler, register: 0, count: 1 },
        ],
    )
    .unwrap();
    device.create_descriptor_set_layout(layout).unwrap()
}

#[test]
fn descriptor_set_layout_rejects_duplicate_registers() {
    let err = DescriptorSetLayout::new(
        0,
        0,
        ShaderStageMask::FRAGMENT,
        vec![
            DescriptorDeclaration { kind: DescriptorKind::ConstantBuffer, register: 0, count: 1 },
            DescriptorDeclaration { kind: DescriptorKind::StorageBuffer, register: 0, count: 1 },
        ],
    );
    assert!(err.is_err());
}

#[test]
fn descriptor_allocations_are_disjoint_and_release_for_reuse() {
    let device = device();
    let layout = layout_with_one_cbv_and_one_sampler(&device);

    let first = device.allocate_descriptor_set(&layout).unwrap();
    let second = device.allocate_descriptor_set(&layout).unwrap();
    assert_ne!(first.buffer_range, second.buffer_range);
    assert_ne!(first.sampler_range, second.sampler_range);

    let first_buffer_range = first.buffer_range;
    let first_sampler_range = first.sampler_range;
    device.release_descriptor_set(first);

    let third = device.allocate_descriptor_set(&layout).unwrap();
    // the released range is the only one the right size, so the sub-allocator
    // must hand it straight back out.
    assert_eq!(third.buffer_range, first_buffer_range);
    assert_eq!(third.sampler_range, first_sampler_range);
}

#[test]
fn binding_descriptor_sets_before_use_pipeline_is_rejected() {
    use gfx_backend_core::command_buffer::CommandBuffer;
    use gfx_backend_core::queue::Queue;

    let device = device();
    let layout = layout_with_one_cbv_and_one_sampler(&device);
    let set = device.allocate_descriptor_set(&layout).unwrap();
    let queue = device.default_queue(gfx_backend_core::types::QueueKind::Graphics);
    let mut cmd = queue.create_command_buffer(false).unwrap();
    cmd.begin().unwrap();
    assert!(cmd.bind_descriptor_sets(0, &[&set]).is_err());
    cmd.use_pipeline(1);
    assert!(cmd.bind_descriptor_sets(0, &[&set]).is_ok());
}

#[test]
fn graphics_pipeline_rejects_too_many_color_render_targets() {
    let device = device();
    let mut desc = GraphicsPipelineDescriptor::default();
    desc.color_formats = vec![Format::R8G8B8A8Unorm; 9];
    assert!(device.create_graphics_pipeline(desc).is_err());
}

#[test]
fn mesh_shader_stage_routes_pipeline_kind_to_mesh() {
    let device = device();
    let mut program = ShaderProgram::default();
    program.modules.push(ShaderModule {
        stage: ShaderStage::Mesh,
        entry_point: "main".to_string(),
        bytecode: vec![0u8; 4],
        declared_bindings: Vec::new(),
        declared_push_constants: Vec::new(),
    });
    let mut desc = GraphicsPipelineDescriptor::default();
    desc.program = program;
    let handle = device.create_graphics_pipeline(desc).unwrap();
    assert_eq!(handle.kind, gfx_backend_core::pipeline::PipelineKind::Mesh);
}

fn empty_raytracing_pipeline_descriptor() -> gfx_backend_core::pipeline::raytracing::RayTracingPipelineDescriptor {
    use gfx_backend_core::pipeline::layout::PipelineLayoutDescriptor;
    use gfx_backend_core::pipeline::raytracing::{RayTracingPipelineDescriptor, ShaderRecordCollection};
    use gfx_backend_core::pipeline::shader::ShaderProgram;

    RayTracingPipelineDescriptor {
        program: ShaderProgram::default(),
        layout: PipelineLayoutDescriptor::new(),
        records: ShaderRecordCollection::default(),
        max_recursion_depth: 1,
        max_ray_payload_size: 32,
        max_attribute_size: 8,
    }
}

#[test]
fn raytracing_pipeline_requires_the_feature_to_be_requested() {
    let without_rt = NullDevice::new(GfxOptions::default(), RequiredFeatures::default());
    assert!(without_rt
        .create_raytracing_pipeline(empty_raytracing_pipeline_descriptor())
        .is_err());

    let with_rt = NullDevice::new(
        GfxOptions::default(),
        RequiredFeatures { ray_tracing: true, ..Default::default() },
    );
    assert!(with_rt
        .create_raytracing_pipeline(empty_raytracing_pipeline_descriptor())
        .is_ok());
}

#[test]
fn acceleration_structure_sizes_are_aligned_and_scratch_never_exceeds_result() {
    use gfx_backend_core::acceleration_structure::{
        AccelerationStructureBuildFlags, BlasBuildInfo, GeometryFlags, TriangleGeometry,
    };

    let device = device();
    let info = BlasBuildInfo {
        geometries: vec![TriangleGeometry {
            vertex_buffer: 1,
            vertex_stride: 12,
            vertex_count: 3000,
            index_buffer: None,
            index_count: 0,
            transform: None,
            flags: GeometryFlags::OPAQUE,
        }],
        flags: AccelerationStructureBuildFlags::PREFER_FAST_TRACE,
    };
    let sizes = device.compute_acceleration_structure_sizes_blas(&info).unwrap();
    assert_eq!(sizes.result_size % 256, 0);
    assert_eq!(sizes.scratch_size % 256, 0);
    assert!(sizes.scratch_size <= sizes.result_size);
}

pub mod heap;
pub mod layout;
pub mod set;

pub use heap::DescriptorHeapAllocator;
pub use layout::{BindingPoint, DescriptorDeclaration, DescriptorKind, DescriptorSetLayout, ShaderStageMask};
pub use set::{BoundView, DescriptorSet, GlobalDescriptorAllocator, MAX_SAMPLER_DESCRIPTORS};

pub mod acceleration_structure;
pub mod barrier;
pub mod command_buffer;
pub mod descriptor;
pub mod device;
pub mod pipeline;
pub mod queue;
pub mod swapchain;

pub use device::Dx12Device;

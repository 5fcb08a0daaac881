pub mod acceleration_structure;
pub mod barrier;
pub mod command_buffer;
pub mod descriptor;
pub mod device;
pub mod instance;
pub mod phy_device;
pub mod pipeline;
pub mod queue;
pub mod swapchain;

pub use device::VulkanDevice;
pub use instance::Instance;

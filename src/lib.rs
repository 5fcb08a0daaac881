//! Cross-API rendering backend core: a single device/queue/command-buffer/
//! render-pass/pipeline abstraction implemented by a Direct3D-12-like and a
//! Vulkan-like native backend, plus an in-memory `null` backend used by
//! this crate's own tests.

pub mod acceleration_structure;
pub mod backends;
pub mod barrier;
pub mod command_buffer;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod pipeline;
pub mod queue;
pub mod render_pass;
pub mod resource;
pub mod surface;
pub mod swapchain;
pub mod types;

pub use config::{DebugMode, GfxOptions, RequiredFeatures};
pub use device::Device;
pub use error::{GfxError, GfxResult};
pub use queue::Queue;

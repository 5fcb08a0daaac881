#[cfg(any(test, feature = "null-backend"))]
pub mod null;

#[cfg(feature = "vulkan")]
pub mod vulkan;

#[cfg(feature = "dx12")]
pub mod dx12;

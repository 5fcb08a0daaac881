use serde::{Deserialize, Serialize};

/// Debug-validation verbosity, mirrored on the level the teacher's
/// `GfxDebugModes` carries for its Vulkan loader.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugMode {
    #[default]
    Off,
    Minimum,
    All,
}

impl DebugMode {
    pub fn is_verbose(self) -> bool {
        matches!(self, DebugMode::All)
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, DebugMode::Off)
    }
}

/// Construction-time options for a [`crate::device::Device`]. Passed in
/// explicitly rather than read from ambient/global state.
#[derive(Debug, Clone)]
pub struct GfxOptions {
    pub dbg: DebugMode,
    /// "auto" picks the highest-ranked GPU (see `GpuType` ordering); any
    /// other value is matched exactly against an adapter name.
    pub gpu: String,
    pub vsync: bool,
    /// 0 = auto (clamped to `[1, available_parallelism]`).
    pub thread_count: usize,
}

impl Default for GfxOptions {
    fn default() -> Self {
        Self {
            dbg: DebugMode::Off,
            gpu: "auto".to_string(),
            vsync: true,
            thread_count: 0,
        }
    }
}

impl GfxOptions {
    pub fn resolved_thread_count(&self) -> usize {
        if self.thread_count == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.thread_count
                .clamp(1, std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).max(1))
        }
    }
}

/// Mandatory and optional device feature requests, validated against the
/// native adapter's reported feature set before any further object is
/// created.
#[derive(Debug, Clone, Default)]
pub struct RequiredFeatures {
    pub mesh_shaders: bool,
    pub ray_tracing: bool,
    pub acceleration_structures: bool,
}

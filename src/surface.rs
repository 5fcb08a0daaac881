use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// A platform window handle, or on non-windowing platforms a callback that
/// produces a native surface handle on demand.
pub enum SurfaceSource<'a> {
    Window(&'a (dyn HasWindowHandleAndDisplay + 'a)),
    Headless,
}

pub trait HasWindowHandleAndDisplay: HasWindowHandle + HasDisplayHandle {}
impl<T: HasWindowHandle + HasDisplayHandle> HasWindowHandleAndDisplay for T {}

use crate::clock::BUFFER_SIZE;

/// Engine startup configuration. There is no on-disk config file — this is
/// an embeddable library, not an application, so defaults are sensible and
/// overrides are passed in by the caller.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Frames per render buffer. Defaults to [`BUFFER_SIZE`]; tests shrink
    /// this to keep scenarios fast.
    pub buffer_size: usize,
    /// Reserved for device selection; the current sink always opens the
    /// platform default output device.
    pub device_name: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
            device_name: None,
        }
    }
}

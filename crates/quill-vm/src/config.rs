//! Virtual machine configuration.

/// Default value stack capacity.
pub const DEFAULT_STACK_SIZE: usize = 2048;
/// Default frame stack capacity.
pub const DEFAULT_MAX_FRAMES: usize = 1024;
/// Default number of global slots.
pub const DEFAULT_GLOBALS_SIZE: usize = 65536;

/// Resource limits for a VM instance.
///
/// ```rust
/// use quill_vm::VmConfig;
///
/// let config = VmConfig::new().stack_size(4096).max_frames(256);
/// assert_eq!(config.stack_size, 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Number of value slots on the operand stack
    pub stack_size: usize,
    /// Maximum call depth, including the program's own frame
    pub max_frames: usize,
    /// Number of global variable slots
    pub globals_size: usize,
}

impl VmConfig {
    /// Creates a configuration with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value stack capacity.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    /// Sets the frame stack capacity.
    pub fn max_frames(mut self, frames: usize) -> Self {
        self.max_frames = frames;
        self
    }

    /// Sets the number of global slots.
    pub fn globals_size(mut self, size: usize) -> Self {
        self.globals_size = size;
        self
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_frames: DEFAULT_MAX_FRAMES,
            globals_size: DEFAULT_GLOBALS_SIZE,
        }
    }
}

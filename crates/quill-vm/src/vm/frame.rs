//! Call frames.

use std::sync::Arc;

use crate::compiler::bytecode::Instructions;
use crate::runtime::function::Closure;

/// One activation of a closure.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The closure being executed
    pub closure: Arc<Closure>,
    /// Offset of the instruction being executed; -1 before the first fetch
    pub ip: isize,
    /// Stack index of the frame's first local slot
    pub base_pointer: usize,
}

impl Frame {
    /// Creates a frame positioned before the first instruction.
    pub fn new(closure: Arc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: -1,
            base_pointer,
        }
    }

    /// The instructions of the executing function.
    pub fn instructions(&self) -> &Instructions {
        &self.closure.func.instructions
    }
}

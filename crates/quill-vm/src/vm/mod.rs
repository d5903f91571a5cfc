//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - the fetch/decode/execute loop and all operators
//! - `frame` - call frames
//!
//! ## Calling convention
//!
//! ```text
//! before Call 2:   [.. callee arg0 arg1]
//!                         ^ base_pointer points at arg0
//! after entering:  [.. callee arg0 arg1 local2 .. localN]
//! after return:    [.. result]
//! ```

mod frame;
mod interpreter;

#[cfg(test)]
mod tests;

pub use frame::Frame;
pub use interpreter::VM;

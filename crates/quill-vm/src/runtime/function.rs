//! Function representation.

use std::fmt;
use std::sync::Arc;

use super::value::Value;
use crate::compiler::bytecode::Instructions;

/// A compiled function body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFunction {
    /// The binding name, if the literal was bound with `let`
    pub name: Option<String>,
    /// The function's instructions
    pub instructions: Instructions,
    /// Number of local slots, parameters included
    pub num_locals: usize,
    /// Number of parameters
    pub num_parameters: usize,
}

impl CompiledFunction {
    /// Creates a new compiled function.
    pub fn new(
        name: Option<String>,
        instructions: Instructions,
        num_locals: usize,
        num_parameters: usize,
    ) -> Self {
        Self {
            name,
            instructions,
            num_locals,
            num_parameters,
        }
    }
}

impl fmt::Display for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{}", name, self.num_parameters),
            None => write!(f, "<anonymous>/{}", self.num_parameters),
        }
    }
}

/// A compiled function together with the free variables it captured.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The function body
    pub func: Arc<CompiledFunction>,
    /// Captured values, in capture order
    pub free: Vec<Value>,
}

impl Closure {
    /// Creates a new closure.
    pub fn new(func: Arc<CompiledFunction>, free: Vec<Value>) -> Self {
        Self { func, free }
    }
}

/// A native (Rust) function.
///
/// Receives the evaluated arguments. An `Err` aborts execution.
pub type BuiltinFunction = fn(&[Value]) -> Result<Value, String>;

/// A named native function.
#[derive(Clone, Copy)]
pub struct Builtin {
    /// The function name
    pub name: &'static str,
    /// The native function pointer
    pub func: BuiltinFunction,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}
